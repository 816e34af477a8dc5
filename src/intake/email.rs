// file: src/intake/email.rs
// description: mail-drop intake that stages supported attachments from .eml messages
// reference: https://docs.rs/mail-parser

use crate::config::EmailConfig;
use crate::error::{RouterError, Result};
use crate::extract::ExtractorRegistry;
use crate::intake::IncomingFile;
use crate::models::{Document, DocumentSource};
use crate::utils::files::create_unique;
use mail_parser::{MessageParser, MimeHeaders};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PROCESSED_DIR: &str = "processed";

/// Headers and attachments pulled out of one RFC 822 message.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub from: Option<String>,
    pub subject: Option<String>,
    pub to: Vec<String>,
    pub attachments: Vec<(String, Vec<u8>)>,
}

impl ParsedMessage {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| RouterError::Email("failed to parse message".to_string()))?;

        let from = message.from().and_then(|addrs| {
            addrs.first().map(|addr| match addr.name() {
                Some(name) => format!("{} <{}>", name, addr.address().unwrap_or_default()),
                None => addr.address().unwrap_or_default().to_string(),
            })
        });

        let to = message
            .to()
            .map(|addrs| {
                addrs
                    .iter()
                    .filter_map(|addr| addr.address())
                    .map(|a| a.to_string())
                    .collect()
            })
            .unwrap_or_default();

        let attachments = message
            .attachments()
            .filter_map(|part| {
                part.attachment_name()
                    .map(|name| (name.to_string(), part.contents().to_vec()))
            })
            .collect();

        Ok(Self {
            from,
            subject: message.subject().map(|s| s.to_string()),
            to,
            attachments,
        })
    }

    pub fn is_addressed_to(&self, user: &str) -> bool {
        self.to.iter().any(|addr| addr.eq_ignore_ascii_case(user))
    }
}

pub struct MailDropIntake {
    config: EmailConfig,
}

impl MailDropIntake {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Stages supported attachments of every waiting message and moves the
    /// message into `processed/`.
    pub fn collect(
        &self,
        registry: &ExtractorRegistry,
        known_hashes: &HashSet<String>,
        force: bool,
    ) -> Result<Vec<IncomingFile>> {
        if !self.config.enabled {
            debug!("Email intake disabled");
            return Ok(Vec::new());
        }

        let drop_dir = &self.config.maildrop_dir;
        if !drop_dir.exists() {
            debug!("Mail drop {} does not exist yet", drop_dir.display());
            return Ok(Vec::new());
        }

        let mut messages: Vec<PathBuf> = fs::read_dir(drop_dir)
            .map_err(|source| RouterError::FileOperation {
                path: drop_dir.clone(),
                source,
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("eml"))
            })
            .collect();
        messages.sort();

        if messages.is_empty() {
            return Ok(Vec::new());
        }

        info!("Reading {} message(s) from {}", messages.len(), drop_dir.display());
        let mut files = Vec::new();

        for message_path in messages {
            match self.stage_message(&message_path, registry, known_hashes, force) {
                Ok(staged) => files.extend(staged),
                Err(e) => warn!("Skipping message {}: {}", message_path.display(), e),
            }
            match self.archive(&message_path) {
                Ok(archived) => debug!("Archived message to {}", archived.display()),
                Err(e) => warn!("Could not archive {}: {}", message_path.display(), e),
            }
        }

        info!("Staged {} attachment(s) from email", files.len());
        Ok(files)
    }

    fn stage_message(
        &self,
        message_path: &Path,
        registry: &ExtractorRegistry,
        known_hashes: &HashSet<String>,
        force: bool,
    ) -> Result<Vec<IncomingFile>> {
        let raw = fs::read(message_path).map_err(|source| RouterError::FileOperation {
            path: message_path.to_path_buf(),
            source,
        })?;
        let message = ParsedMessage::parse(&raw)?;

        if let Some(user) = self.config.user.as_deref().filter(|u| !u.is_empty()) {
            if !message.is_addressed_to(user) {
                debug!(
                    "Message {} not addressed to {}, ignoring",
                    message_path.display(),
                    user
                );
                return Ok(Vec::new());
            }
        }

        let stem = message_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "message".to_string());
        let target_dir = self.config.staging_dir.join(stem);

        let mut staged = Vec::new();
        for (name, contents) in &message.attachments {
            let Some(file_name) = safe_file_name(name) else {
                debug!("Ignoring attachment with unusable name '{}'", name);
                continue;
            };

            if !registry.supports(Path::new(&file_name)) {
                debug!("Ignoring unsupported attachment {}", file_name);
                continue;
            }

            let content_hash = Document::compute_hash(contents);
            if !force && known_hashes.contains(&content_hash) {
                debug!("Attachment {} already processed", file_name);
                continue;
            }

            let target = match stage_attachment(&target_dir, &file_name, contents, &content_hash) {
                Ok(target) => target,
                Err(e) => {
                    warn!("Could not stage attachment {}: {}", file_name, e);
                    continue;
                }
            };

            staged.push(IncomingFile {
                path: target,
                file_name,
                size: contents.len() as u64,
                content_hash,
                source: DocumentSource::Email {
                    from: message.from.clone(),
                    subject: message.subject.clone(),
                },
            });
        }

        Ok(staged)
    }

    /// Moves a message into `processed/` under a name no earlier message holds.
    fn archive(&self, message_path: &Path) -> Result<PathBuf> {
        let processed = self.config.maildrop_dir.join(PROCESSED_DIR);
        fs::create_dir_all(&processed).map_err(|source| RouterError::FileOperation {
            path: processed.clone(),
            source,
        })?;

        let name = message_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "message.eml".to_string());
        let file_operation = |source: std::io::Error| RouterError::FileOperation {
            path: message_path.to_path_buf(),
            source,
        };

        let (target, placeholder) = create_unique(&processed, &name, "").map_err(file_operation)?;
        drop(placeholder);

        if let Err(e) = fs::rename(message_path, &target) {
            let _ = fs::remove_file(&target);
            return Err(file_operation(e));
        }
        Ok(target)
    }
}

/// Writes one attachment under a name unique within `dir`; a clashing name
/// gets the `-<hash8>` suffix.
fn stage_attachment(
    dir: &Path,
    file_name: &str,
    contents: &[u8],
    content_hash: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| RouterError::FileOperation {
        path: dir.to_path_buf(),
        source,
    })?;

    let short_hash: String = content_hash.chars().take(8).collect();
    let (target, mut file) =
        create_unique(dir, file_name, &short_hash).map_err(|source| RouterError::FileOperation {
            path: dir.join(file_name),
            source,
        })?;

    if let Err(source) = file.write_all(contents) {
        drop(file);
        let _ = fs::remove_file(&target);
        return Err(RouterError::FileOperation {
            path: target,
            source,
        });
    }

    Ok(target)
}

/// Final path component of an attachment name, rejecting empty and dot names.
fn safe_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}
