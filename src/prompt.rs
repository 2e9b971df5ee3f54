use tracing::warn;

use crate::{
    capability::Captioner,
    error::{OutwardError, OutwardResult},
};

/// Static fallback used when no fallback prompt was given and no scene
/// description is available. Deliberately generic: it asks for more of the
/// same scene and nothing else.
pub const DEFAULT_FALLBACK_PROMPT: &str =
    "seamless continuation of the surrounding scenery, matching style and lighting, no humans";

/// Per-run prompt constants resolved once at setup.
///
/// The captioning collaborator is consulted lazily, at most once: only when
/// the explicit prompt or the explicit fallback is missing. Its output is
/// cached as the scene description and reused for both derivations and for
/// per-square composition.
#[derive(Clone, Debug)]
pub struct PromptState {
    human: String,
    fallback: String,
    description: Option<String>,
}

impl PromptState {
    /// Resolve the human prompt, the fallback prompt and the cached
    /// description.
    ///
    /// The human prompt is the explicit `prompt`, else the description;
    /// with neither available this fails, before any inpainting call is
    /// made. The fallback degrades instead of failing: explicit `fallback`
    /// verbatim, else the description suffixed with ", no humans", else
    /// [`DEFAULT_FALLBACK_PROMPT`].
    pub fn prepare(
        prompt: Option<&str>,
        fallback: Option<&str>,
        image: &image::RgbaImage,
        captioner: &mut dyn Captioner,
    ) -> OutwardResult<Self> {
        let description = if prompt.is_none() || fallback.is_none() {
            match captioner.describe(image) {
                Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                Ok(_) => {
                    warn!("captioner returned an empty description");
                    None
                }
                Err(err) => {
                    warn!(error = %err, "captioner unavailable");
                    None
                }
            }
        } else {
            None
        };

        let human = match (prompt, &description) {
            (Some(text), _) => text.to_string(),
            (None, Some(description)) => description.clone(),
            (None, None) => {
                return Err(OutwardError::validation(
                    "no prompt given and no scene description available; pass an explicit prompt",
                ));
            }
        };

        let fallback = match (fallback, &description) {
            (Some(text), _) => text.to_string(),
            (None, Some(description)) => format!("{description}, no humans"),
            (None, None) => DEFAULT_FALLBACK_PROMPT.to_string(),
        };

        Ok(Self {
            human,
            fallback,
            description,
        })
    }

    pub fn human(&self) -> &str {
        &self.human
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The prompt for one square: the human prompt when a subject is
    /// present, else the fallback. The cached description is appended for
    /// thematic consistency unless the base already contains it.
    pub fn compose(&self, subject_present: bool) -> String {
        let base = if subject_present {
            &self.human
        } else {
            &self.fallback
        };
        match &self.description {
            Some(description) if !base.contains(description.as_str()) => {
                format!("{base}, {description}")
            }
            _ => base.clone(),
        }
    }
}
