pub mod in_memory;
pub mod pinecone;
pub mod postgres;
