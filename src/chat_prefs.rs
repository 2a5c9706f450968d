use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BotError;

const CHATBOT_FILE: &str = "chatbot_settings.json";
const GROUPS_FILE: &str = "group_settings.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotEntry {
    pub enabled_at: String,
    pub enabled_by: String,
    pub chat_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatbotSettings {
    #[serde(default)]
    enabled_chats: HashMap<String, ChatbotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    pub kind: String,
    pub added_at: String,
    pub member_count: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GroupSettings {
    #[serde(default)]
    groups: HashMap<String, GroupEntry>,
}

/// Flat JSON documents for chat-level feature toggles: chatbot enablement
/// and the managed-group registry. Loaded once at startup; every mutation
/// rewrites the file.
pub struct ChatPrefs {
    dir: PathBuf,
    chatbot: Mutex<ChatbotSettings>,
    groups: Mutex<GroupSettings>,
}

impl ChatPrefs {
    pub fn new(data_dir: &str) -> Result<Self, BotError> {
        let dir = PathBuf::from(data_dir);
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            chatbot: Mutex::new(load_or_default(&dir.join(CHATBOT_FILE))),
            groups: Mutex::new(load_or_default(&dir.join(GROUPS_FILE))),
            dir,
        })
    }

    pub fn chatbot_enabled(&self, chat_id: i64) -> bool {
        self.chatbot
            .lock()
            .unwrap()
            .enabled_chats
            .contains_key(&chat_id.to_string())
    }

    pub fn enable_chatbot(
        &self,
        chat_id: i64,
        enabled_by: &str,
        chat_name: &str,
    ) -> Result<(), BotError> {
        let mut settings = self.chatbot.lock().unwrap();
        settings.enabled_chats.insert(
            chat_id.to_string(),
            ChatbotEntry {
                enabled_at: chrono::Utc::now().to_rfc3339(),
                enabled_by: enabled_by.to_string(),
                chat_name: chat_name.to_string(),
            },
        );
        save(&self.dir.join(CHATBOT_FILE), &*settings)
    }

    /// Returns false when the chat was not enabled to begin with.
    pub fn disable_chatbot(&self, chat_id: i64) -> Result<bool, BotError> {
        let mut settings = self.chatbot.lock().unwrap();
        let removed = settings.enabled_chats.remove(&chat_id.to_string()).is_some();
        if removed {
            save(&self.dir.join(CHATBOT_FILE), &*settings)?;
        }
        Ok(removed)
    }

    pub fn record_group(
        &self,
        chat_id: i64,
        name: &str,
        kind: &str,
        member_count: Option<u32>,
    ) -> Result<(), BotError> {
        let mut settings = self.groups.lock().unwrap();
        settings.groups.insert(
            chat_id.to_string(),
            GroupEntry {
                name: name.to_string(),
                kind: kind.to_string(),
                added_at: chrono::Utc::now().to_rfc3339(),
                member_count,
            },
        );
        save(&self.dir.join(GROUPS_FILE), &*settings)
    }

    pub fn remove_group(&self, chat_id: i64) -> Result<bool, BotError> {
        let mut settings = self.groups.lock().unwrap();
        let removed = settings.groups.remove(&chat_id.to_string()).is_some();
        if removed {
            save(&self.dir.join(GROUPS_FILE), &*settings)?;
        }
        Ok(removed)
    }

    pub fn list_groups(&self) -> Vec<(String, GroupEntry)> {
        let settings = self.groups.lock().unwrap();
        let mut groups: Vec<(String, GroupEntry)> = settings
            .groups
            .iter()
            .map(|(id, g)| (id.clone(), g.clone()))
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups
    }

    pub fn group_chat_ids(&self) -> Vec<i64> {
        self.groups
            .lock()
            .unwrap()
            .groups
            .keys()
            .filter_map(|id| id.parse().ok())
            .collect()
    }
}

fn load_or_default<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!("Ignoring malformed {}: {e}", path.display());
                T::default()
            }
        },
        Err(_) => T::default(),
    }
}

fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), BotError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_dir() -> String {
        std::env::temp_dir()
            .join(format!("nicebot_prefs_test_{}", Uuid::new_v4()))
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn test_chatbot_toggle_roundtrip() {
        let dir = test_dir();
        let prefs = ChatPrefs::new(&dir).unwrap();

        assert!(!prefs.chatbot_enabled(5));
        prefs.enable_chatbot(5, "42", "Mon groupe").unwrap();
        assert!(prefs.chatbot_enabled(5));

        // State survives a reload from disk.
        let prefs2 = ChatPrefs::new(&dir).unwrap();
        assert!(prefs2.chatbot_enabled(5));

        assert!(prefs2.disable_chatbot(5).unwrap());
        assert!(!prefs2.disable_chatbot(5).unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_group_registry() {
        let dir = test_dir();
        let prefs = ChatPrefs::new(&dir).unwrap();

        prefs
            .record_group(-100, "Groupe Test", "supergroup", Some(12))
            .unwrap();
        prefs.record_group(-200, "Autre", "group", None).unwrap();

        let groups = prefs.list_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(prefs.group_chat_ids().len(), 2);

        assert!(prefs.remove_group(-100).unwrap());
        assert_eq!(prefs.list_groups().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_falls_back_to_default() {
        let dir = test_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(Path::new(&dir).join(CHATBOT_FILE), "{not json").unwrap();

        let prefs = ChatPrefs::new(&dir).unwrap();
        assert!(!prefs.chatbot_enabled(1));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
