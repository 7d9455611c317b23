//! Transient-error classification of non-service health descriptions.
//!
//! A failing instance whose description matches the configured pattern is
//! expected to recover on its own. The aggregator still counts it as healthy
//! and only flags its zone as "unknown".

use regex::Regex;

use crate::config::ClassifierConfig;
use crate::error::ConfigError;

/// Pattern the load balancer uses for self-resolving health check failures.
pub const DEFAULT_TRANSIENT_PATTERN: &str = "transient error";

/// Decides whether a non-service description describes a transient failure.
pub trait TransientClassifier: Send + Sync {
    fn is_transient(&self, description: &str) -> bool;
}

impl<F> TransientClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_transient(&self, description: &str) -> bool {
        self(description)
    }
}

/// Substring match against the description.
#[derive(Debug, Clone)]
pub struct SubstringClassifier {
    needle: String,
    case_sensitive: bool,
}

impl SubstringClassifier {
    /// Case-sensitive substring classifier.
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            case_sensitive: true,
        }
    }

    /// Case-insensitive substring classifier.
    pub fn case_insensitive(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into().to_lowercase(),
            case_sensitive: false,
        }
    }
}

impl Default for SubstringClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSIENT_PATTERN)
    }
}

impl TransientClassifier for SubstringClassifier {
    fn is_transient(&self, description: &str) -> bool {
        if self.case_sensitive {
            description.contains(&self.needle)
        } else {
            description.to_lowercase().contains(&self.needle)
        }
    }
}

/// Regular expression match against the description.
#[derive(Debug, Clone)]
pub struct RegexClassifier {
    regex: Regex,
}

impl RegexClassifier {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl TransientClassifier for RegexClassifier {
    fn is_transient(&self, description: &str) -> bool {
        self.regex.is_match(description)
    }
}

/// Builds the classifier described by the `[classifier]` config section.
pub fn classifier_from_config(
    config: &ClassifierConfig,
) -> Result<Box<dyn TransientClassifier>, ConfigError> {
    if config.pattern.is_empty() {
        return Err(ConfigError::MissingValue {
            field: "classifier.pattern".to_owned(),
        });
    }

    match config.kind.as_str() {
        "substring" => {
            let classifier = if config.case_sensitive {
                SubstringClassifier::new(&config.pattern)
            } else {
                SubstringClassifier::case_insensitive(&config.pattern)
            };
            Ok(Box::new(classifier))
        }
        "regex" => {
            let pattern = if config.case_sensitive {
                config.pattern.clone()
            } else {
                format!("(?i){}", config.pattern)
            };
            let classifier =
                RegexClassifier::new(&pattern).map_err(|e| ConfigError::InvalidValue {
                    field: "classifier.pattern".to_owned(),
                    reason: e.to_string(),
                })?;
            Ok(Box::new(classifier))
        }
        other => Err(ConfigError::InvalidValue {
            field: "classifier.kind".to_owned(),
            reason: format!("unknown classifier '{other}', expected 'substring' or 'regex'"),
        }),
    }
}
