use std::str::FromStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

/// Fixed UI phrases the client produces on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrase {
    Welcome,
    SignInRequired,
    SendFailed,
    ConversationReset,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }

    pub fn phrase(&self, phrase: Phrase) -> &'static str {
        match (self, phrase) {
            (Language::En, Phrase::Welcome) => {
                "Welcome! I can help you plan flights, hotels, and activities. What would you like to do?"
            }
            (Language::En, Phrase::SignInRequired) => "Please sign in to continue",
            (Language::En, Phrase::SendFailed) => {
                "Sorry, there was an error processing your request. Please try again."
            }
            (Language::En, Phrase::ConversationReset) => {
                "Conversation reset. How can I help you plan your trip?"
            }
            (Language::De, Phrase::Welcome) => {
                "Willkommen! Ich helfe dir bei der Planung von Flügen, Hotels und Aktivitäten. Was möchtest du tun?"
            }
            (Language::De, Phrase::SignInRequired) => "Bitte melde dich an, um fortzufahren",
            (Language::De, Phrase::SendFailed) => {
                "Entschuldigung, bei der Verarbeitung deiner Anfrage ist ein Fehler aufgetreten. Bitte versuche es erneut."
            }
            (Language::De, Phrase::ConversationReset) => {
                "Unterhaltung zurückgesetzt. Wie kann ich dir bei der Reiseplanung helfen?"
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "de" => Ok(Language::De),
            other => Err(UnsupportedLanguage(other.to_string())),
        }
    }
}
