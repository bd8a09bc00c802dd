use crate::config::RenderConfig;
use crate::resource::types::{Body, MessageId};
use regex::Regex;
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("message id '{0}' is not allowed in a body locator")]
    InvalidMessageId(String),
    #[error("body locator {0} is outside the configured server")]
    ForeignOrigin(String),
    #[error("content type '{0}' is not allowed for rendering")]
    ContentType(String),
    #[error("failed to render body: {0}")]
    Render(String),
}

/// Location of one message body. Only [`BodyPolicy::locate`] builds these,
/// so holding one means the id and origin were checked.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyLocator(Url);

impl BodyLocator {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for BodyLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allow-list for inline message bodies: which ids may be turned into a
/// locator, and which content types may be rendered.
#[derive(Debug, Clone)]
pub struct BodyPolicy {
    base: Url,
    message_id_pattern: Regex,
    allowed_content_types: Vec<String>,
}

impl BodyPolicy {
    pub fn new(base: Url, message_id_pattern: Regex, allowed_content_types: Vec<String>) -> Self {
        BodyPolicy {
            base,
            message_id_pattern,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(base: Url, render: &RenderConfig) -> Self {
        Self::new(
            base,
            render.message_id_regex.clone(),
            render.allowed_content_types.clone(),
        )
    }

    /// Build `{base}/emails/list/{id}/html` for an allowed id.
    pub fn locate(&self, message_id: &MessageId) -> Result<BodyLocator, PolicyError> {
        let id = message_id.to_string();
        // "." and ".." would be swallowed as path segments and point elsewhere
        let dots_only = id.chars().all(|c| c == '.');
        if dots_only || !self.message_id_pattern.is_match(&id) {
            return Err(PolicyError::InvalidMessageId(id));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PolicyError::ForeignOrigin(self.base.to_string()))?
            .pop_if_empty()
            .extend(["emails", "list", id.as_str(), "html"]);

        self.check_origin(&url)?;
        Ok(BodyLocator(url))
    }

    pub fn check_origin(&self, url: &Url) -> Result<(), PolicyError> {
        if url.origin() == self.base.origin() {
            Ok(())
        } else {
            Err(PolicyError::ForeignOrigin(url.to_string()))
        }
    }

    fn media_type(content_type: &str) -> String {
        content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }

    pub fn admit(&self, body: &Body) -> Result<(), PolicyError> {
        let media_type = Self::media_type(&body.content_type);
        if self.allowed_content_types.iter().any(|t| *t == media_type) {
            Ok(())
        } else {
            Err(PolicyError::ContentType(body.content_type.clone()))
        }
    }

    /// Admit the body and turn it into plain lines. HTML goes through
    /// html2text, so no markup or script survives to the screen.
    pub fn render(&self, body: &Body, width: usize) -> Result<Vec<String>, PolicyError> {
        self.admit(body)?;
        let text = if Self::media_type(&body.content_type) == "text/html" {
            html2text::from_read(body.text.as_bytes(), width.max(20))
                .map_err(|e| PolicyError::Render(e.to_string()))?
        } else {
            body.text.clone()
        };
        Ok(text.lines().map(|l| l.trim_end().to_string()).collect())
    }
}
