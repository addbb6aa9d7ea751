//! Interactive terminal chooser over the user's drive.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

use crate::chooser::ChooserLibrary;
use crate::client::DriveClient;
use crate::enricher::METADATA_FIELDS;
use crate::error::{DriveError, Result};
use crate::link::extract_id;
use crate::models::{ApiDiscovery, FileMetadata, FileSelection, PickerConfig, PickerResponse};

/// API discovery document for the drive service.
pub const DRIVE_DISCOVERY_URL: &str = "https://www.googleapis.com/discovery/v1/apis/drive/v3/rest";

/// Folder the chooser opens in.
const ROOT_FOLDER: &str = "root";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerCommand {
    Cancel,
    Up,
    Select(usize),
    Link(String),
    Invalid(String),
}

/// Parse a line typed at the chooser prompt. Listing indices are 1-based.
pub fn parse_command(line: &str) -> PickerCommand {
    let line = line.trim();
    match line {
        "q" | "quit" => PickerCommand::Cancel,
        ".." => PickerCommand::Up,
        _ => {
            if let Ok(n) = line.parse::<usize>() {
                return match n {
                    0 => PickerCommand::Invalid(line.to_string()),
                    n => PickerCommand::Select(n - 1),
                };
            }
            match extract_id(line) {
                Ok(id) => PickerCommand::Link(id),
                Err(_) => PickerCommand::Invalid(line.to_string()),
            }
        }
    }
}

/// Chooser that lists folders in the terminal and reads picks from `R`.
pub struct TerminalPicker<R = BufReader<Stdin>> {
    drive: DriveClient,
    input: Mutex<R>,
}

impl TerminalPicker {
    /// Fetch the drive discovery document and build a picker reading stdin.
    pub async fn load(http: Client, discovery_url: &str) -> Result<Arc<dyn ChooserLibrary>> {
        debug!(url = discovery_url, "loading drive discovery document");
        let response = http.get(discovery_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriveError::ApiError {
                status: status.as_u16(),
                message: format!("drive discovery failed: {}", discovery_url),
            });
        }
        let discovery: ApiDiscovery = response.json().await?;

        let drive = DriveClient::new(http, discovery.api_base());
        Ok(Arc::new(TerminalPicker::new(drive, BufReader::new(tokio::io::stdin()))))
    }
}

impl<R> TerminalPicker<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(drive: DriveClient, input: R) -> Self {
        Self {
            drive,
            input: Mutex::new(input),
        }
    }

    async fn read_command(&self) -> Result<Option<PickerCommand>> {
        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(parse_command(&line)))
    }
}

/// What the chooser should do with an item the user pointed at.
enum Choice {
    Enter(FileMetadata),
    Pick(FileMetadata),
    Refuse(String),
}

fn choose(item: FileMetadata, config: &PickerConfig) -> Choice {
    if !item.is_folder() {
        return Choice::Pick(item);
    }
    if config.view.folder_selectable {
        Choice::Pick(item)
    } else if config.view.include_folders {
        Choice::Enter(item)
    } else {
        Choice::Refuse(format!("{} is a folder", item.name))
    }
}

#[async_trait]
impl<R> ChooserLibrary for TerminalPicker<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn show(&self, config: &PickerConfig) -> Result<PickerResponse> {
        let drive = self.drive.clone().with_developer_key(config.developer_key.clone());
        let mut path: Vec<(String, String)> = vec![(ROOT_FOLDER.to_string(), "My Drive".to_string())];

        loop {
            let (folder_id, _) = path.last().cloned().unwrap_or_default();
            let entries = drive
                .list_folder(&folder_id, &config.oauth_token, config.view.include_folders)
                .await?;

            let breadcrumb: Vec<&str> = path.iter().map(|(_, name)| name.as_str()).collect();
            println!("\n{}", breadcrumb.join(" / "));
            if entries.is_empty() {
                println!("  (empty)");
            }
            for (idx, entry) in entries.iter().enumerate() {
                println!("{:>4}. {}", idx + 1, entry);
            }

            // Re-prompt until the input changes the folder or closes the chooser.
            loop {
                println!("Pick a number, '..' to go up, paste a link, or 'q' to cancel:");
                let command = match self.read_command().await? {
                    Some(command) => command,
                    None => return Ok(PickerResponse::cancel()),
                };

                let item = match command {
                    PickerCommand::Cancel => return Ok(PickerResponse::cancel()),
                    PickerCommand::Up => {
                        if path.len() > 1 {
                            path.pop();
                            break;
                        }
                        continue;
                    }
                    PickerCommand::Select(idx) => match entries.get(idx) {
                        Some(entry) => entry.clone(),
                        None => {
                            println!("No entry {}.", idx + 1);
                            continue;
                        }
                    },
                    PickerCommand::Link(id) => {
                        match drive.get_file(&id, &config.oauth_token, METADATA_FIELDS).await {
                            Ok(item) => item,
                            Err(e) => {
                                println!("Cannot open {}: {}", id, e);
                                continue;
                            }
                        }
                    }
                    PickerCommand::Invalid(input) => {
                        println!("Not understood: {:?}", input);
                        continue;
                    }
                };

                match choose(item, config) {
                    Choice::Pick(item) => return Ok(PickerResponse::picked(FileSelection::from(item))),
                    Choice::Enter(folder) => {
                        path.push((folder.id, folder.name));
                        break;
                    }
                    Choice::Refuse(reason) => println!("{}", reason),
                }
            }
        }
    }
}
