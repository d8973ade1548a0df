//! Augmented prompt construction.

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "Tu es un assistant utile. Utilise le contexte suivant, issu de la mémoire, pour répondre à la question. Si le contexte n'est pas pertinent, réponds simplement à la question.\n\nContexte :\n{context}\n\nQuestion : {message}";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const MESSAGE_PLACEHOLDER: &str = "{message}";

/// Builds the prompt sent to the completion provider.
///
/// The template may contain `{context}` and `{message}`. Substitution walks the
/// template once, so placeholder tokens inside snippets or the user message
/// are copied literally.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    template: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptComposer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Compose the prompt for `message` given snippets in rank order.
    pub fn compose(&self, snippets: &[String], message: &str) -> String {
        let context = snippets.join("\n");

        let mut out = String::with_capacity(self.template.len() + context.len() + message.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
                out.push_str(&context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(MESSAGE_PLACEHOLDER) {
                out.push_str(message);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}
