use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::answer::{Answer, AnswerSet};
use crate::models::question::Question;
use crate::models::quiz_response::QuizResponse;
use crate::models::session::QuizSessionState;
use crate::models::user::UserData;

pub const SESSION_STORAGE_KEY: &str = "seven-frequencies-quiz";

/// Synchronous string key/value store scoped to one quiz session.
pub trait SessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Internal("session storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Internal("session storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Internal("session storage lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSessionRef<'a> {
    questions: &'a [Question],
    current_question_index: usize,
    answers: &'a AnswerSet,
    user_data: Option<&'a UserData>,
    quiz_response: Option<&'a QuizResponse>,
}

/// Loose shape used on load: answers stay raw so a single bad entry can be
/// dropped instead of failing the whole blob.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSessionRaw {
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default)]
    current_question_index: usize,
    #[serde(default)]
    answers: Vec<JsonValue>,
    #[serde(default)]
    user_data: Option<UserData>,
    #[serde(default)]
    quiz_response: Option<QuizResponse>,
}

/// Reads and writes the quiz session blob under a fixed key.
pub struct SessionPersistence<S: SessionStorage> {
    storage: S,
    key: String,
}

impl<S: SessionStorage> SessionPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, SESSION_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn save(&self, state: &QuizSessionState) -> Result<()> {
        let persisted = PersistedSessionRef {
            questions: &state.questions,
            current_question_index: state.current_question_index,
            answers: &state.answers,
            user_data: state.user_data.as_ref(),
            quiz_response: state.quiz_response.as_ref(),
        };
        let json = serde_json::to_string(&persisted)?;
        self.storage.set(&self.key, &json)
    }

    /// Returns `None` for a missing or unreadable blob so callers always have a
    /// cold-start path.
    pub fn load(&self) -> Option<QuizSessionState> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "Could not read stored quiz session");
                return None;
            }
        };

        let parsed: PersistedSessionRaw = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "Discarding unreadable stored quiz session");
                return None;
            }
        };

        Some(sanitize(parsed))
    }

    pub fn clear(&self) -> Result<()> {
        debug!(key = %self.key, "Clearing stored quiz session");
        self.storage.remove(&self.key)
    }
}

fn sanitize(raw: PersistedSessionRaw) -> QuizSessionState {
    let raw_count = raw.answers.len();
    let answers: AnswerSet = raw
        .answers
        .into_iter()
        .filter(|value| !value.is_null())
        .filter_map(|value| serde_json::from_value::<Answer>(value).ok())
        .collect();

    if answers.len() != raw_count {
        warn!(
            stored = raw_count,
            kept = answers.len(),
            "Dropped malformed answers from stored quiz session"
        );
    }

    let current_question_index = raw.current_question_index.min(raw.questions.len());

    QuizSessionState {
        questions: raw.questions,
        current_question_index,
        answers,
        user_data: raw.user_data,
        quiz_response: raw.quiz_response,
        ..QuizSessionState::default()
    }
}
