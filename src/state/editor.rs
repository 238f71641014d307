use crate::api::ApiClient;
use anyhow::Result;

/// Workspace file editor state: one selected path, its buffered content, and
/// a save-in-flight flag. Loading replaces the buffer wholesale; there is no
/// local diffing against the server copy.
#[derive(Debug, Default)]
pub struct FileEditor {
    pub selected_path: String,
    pub content: String,
    pub saving: bool,
    pub dirty: bool,
}

impl FileEditor {
    pub fn new(initial_path: &str) -> Self {
        Self {
            selected_path: initial_path.to_string(),
            ..Self::default()
        }
    }

    pub async fn load(&mut self, client: &ApiClient, path: &str) -> Result<()> {
        let content = client.read_file(path).await?;
        self.selected_path = path.to_string();
        self.content = content;
        self.dirty = false;
        Ok(())
    }

    pub async fn save(&mut self, client: &ApiClient) -> Result<()> {
        self.saving = true;
        let result = client.save_file(&self.selected_path, &self.content).await;
        self.saving = false;
        if result.is_ok() {
            self.dirty = false;
        }
        result
    }

    pub fn set_content(&mut self, content: String) {
        if content != self.content {
            self.content = content;
            self.dirty = true;
        }
    }
}
