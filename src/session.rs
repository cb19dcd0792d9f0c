//! Conversion session: choose a file, convert it, save it, move it.
//!
//! The session is a small state machine (`Idle -> FileChosen -> Converted ->
//! Saved`). Every transition returns the paths it produced so callers never
//! need shared "last output" state.

use crate::config::OutputSettings;
use crate::page::PageShell;
use crate::renderer::RenderOptions;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("invalid Markdown file (no content): {}", .0.display())]
    EmptyDocument(PathBuf),

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open viewer for {}: {source}", .path.display())]
    Viewer {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    /// Map an I/O failure on `path` onto the user-facing error kinds
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => SessionError::NotFound(path),
            io::ErrorKind::PermissionDenied => SessionError::PermissionDenied(path),
            io::ErrorKind::AlreadyExists => SessionError::AlreadyExists(path),
            _ => SessionError::Io { path, source },
        }
    }
}

/// Read a Markdown file as UTF-8; `Ok(None)` when it does not exist
pub fn read_markdown_file(path: &Path) -> Result<Option<String>, SessionError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SessionError::from_io(path, err)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    FileChosen {
        source: PathBuf,
        markdown: String,
    },
    Converted {
        source: PathBuf,
        markdown: String,
        page: String,
        preview: PathBuf,
    },
    Saved {
        source: PathBuf,
        markdown: String,
        page: String,
        preview: PathBuf,
        saved: PathBuf,
    },
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::FileChosen { .. } => "file chosen",
            SessionState::Converted { .. } => "converted",
            SessionState::Saved { .. } => "saved",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct Session {
    output: OutputSettings,
    shell: PageShell,
    options: RenderOptions,
    state: SessionState,
}

impl Session {
    pub fn new(output: OutputSettings, shell: PageShell, options: RenderOptions) -> Self {
        Session {
            output,
            shell,
            options,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// Load a Markdown file, replacing whatever the session held before
    pub fn choose_file(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        let markdown =
            read_markdown_file(path)?.ok_or_else(|| SessionError::NotFound(path.to_path_buf()))?;

        if markdown.trim().is_empty() {
            return Err(SessionError::EmptyDocument(path.to_path_buf()));
        }

        debug!(path = %path.display(), bytes = markdown.len(), "file chosen");
        self.state = SessionState::FileChosen {
            source: path.to_path_buf(),
            markdown,
        };
        Ok(())
    }

    /// Convert the chosen file and write the preview page; returns the preview path
    pub fn convert(&mut self) -> Result<PathBuf, SessionError> {
        let (source, markdown) = match &self.state {
            SessionState::Idle => return Err(self.invalid("convert")),
            SessionState::FileChosen { source, markdown }
            | SessionState::Converted {
                source, markdown, ..
            }
            | SessionState::Saved {
                source, markdown, ..
            } => (source.clone(), markdown.clone()),
        };

        let conversion = crate::convert(&markdown, &self.options);
        let page = self.shell.wrap(&conversion.fragment);

        let preview = self.output.preview_file.clone();
        write_file(&preview, &page)?;
        info!(preview = %preview.display(), blocks = conversion.document.blocks.len(), "preview written");

        self.state = SessionState::Converted {
            source,
            markdown,
            page,
            preview: preview.clone(),
        };
        Ok(preview)
    }

    /// Save the converted page into the output directory as `<stem>.html`
    pub fn save(&mut self) -> Result<PathBuf, SessionError> {
        let (source, markdown, page, preview) = match &self.state {
            SessionState::Converted {
                source,
                markdown,
                page,
                preview,
            }
            | SessionState::Saved {
                source,
                markdown,
                page,
                preview,
                ..
            } => (source.clone(), markdown.clone(), page.clone(), preview.clone()),
            _ => return Err(self.invalid("save")),
        };

        fs::create_dir_all(&self.output.directory)
            .map_err(|err| SessionError::from_io(&self.output.directory, err))?;
        let saved = self.output.directory.join(output_file_name(&source));
        write_file(&saved, &page)?;
        info!(saved = %saved.display(), "page saved");

        self.state = SessionState::Saved {
            source,
            markdown,
            page,
            preview,
            saved: saved.clone(),
        };
        Ok(saved)
    }

    /// Move the saved page to a caller-chosen path; refuses to overwrite
    pub fn relocate(&mut self, destination: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let destination = destination.as_ref();
        let invalid = self.invalid("relocate");
        let SessionState::Saved { saved, .. } = &mut self.state else {
            return Err(invalid);
        };

        if destination.exists() {
            return Err(SessionError::AlreadyExists(destination.to_path_buf()));
        }

        if let Err(err) = fs::rename(&*saved, destination) {
            // Renames across filesystems fail; fall back to copy and remove
            if err.kind() == io::ErrorKind::NotFound {
                return Err(SessionError::from_io(saved, err));
            }
            fs::copy(&*saved, destination)
                .map_err(|err| SessionError::from_io(destination, err))?;
            fs::remove_file(&*saved).map_err(|err| SessionError::from_io(saved, err))?;
        }

        info!(from = %saved.display(), to = %destination.display(), "page relocated");
        *saved = destination.to_path_buf();
        Ok(saved.clone())
    }

    /// The preview if it still exists, otherwise the saved page
    pub fn viewable_path(&self) -> Option<&Path> {
        let (preview, saved) = match &self.state {
            SessionState::Converted { preview, .. } => (preview, None),
            SessionState::Saved { preview, saved, .. } => (preview, Some(saved)),
            _ => return None,
        };

        if preview.exists() {
            Some(preview.as_path())
        } else {
            saved.filter(|path| path.exists()).map(PathBuf::as_path)
        }
    }
}

/// `notes.md` becomes `notes.html`
fn output_file_name(source: &Path) -> PathBuf {
    let mut name = source
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| "document".into());
    name.push(".html");
    PathBuf::from(name)
}

fn write_file(path: &Path, contents: &str) -> Result<(), SessionError> {
    fs::write(path, contents).map_err(|err| SessionError::from_io(path, err))
}
