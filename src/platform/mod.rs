#[cfg(feature = "desktop")]
pub mod desktop;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::models::PromptRequest;

/// Receives every status line. Observers only; nothing flows back.
pub trait StatusSink: Send + Sync {
    fn report(&self, text: &str);
}

/// Presents a binary choice and resolves with the selected option index.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    async fn ask_user_choice(&self, request: &PromptRequest) -> usize;
}

/// Status sink for headless runs; the service already logs every line, so
/// this only echoes to stdout.
pub struct ConsoleStatusSink;

impl StatusSink for ConsoleStatusSink {
    fn report(&self, text: &str) {
        println!("{}", text);
    }
}

/// Asks on stdin. Anything but an empty line or `y`/`yes` declines; a closed
/// stdin declines too. One buffered reader serves every prompt, so answers
/// typed ahead are not lost.
pub struct ConsolePrompt<R = Stdin> {
    input: Mutex<BufReader<R>>,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self::from_reader(tokio::io::stdin())
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AsyncRead + Unpin + Send> ConsolePrompt<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            input: Mutex::new(BufReader::new(reader)),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> UserPrompt for ConsolePrompt<R> {
    async fn ask_user_choice(&self, request: &PromptRequest) -> usize {
        let mut input = self.input.lock().await;

        let question = format!(
            "{}\n{}\n[{}/{}] (Y/n): ",
            request.title, request.message, request.options[0], request.options[1]
        );
        let mut stdout = tokio::io::stdout();
        if stdout.write_all(question.as_bytes()).await.is_err() {
            return 1;
        }
        let _ = stdout.flush().await;

        let mut line = String::new();
        match input.read_line(&mut line).await {
            Ok(0) | Err(_) => 1,
            Ok(_) => parse_answer(&line),
        }
    }
}

/// Answers every prompt with the same index. Used for unattended deployments.
pub struct FixedAnswer(pub usize);

#[async_trait]
impl UserPrompt for FixedAnswer {
    async fn ask_user_choice(&self, request: &PromptRequest) -> usize {
        log::info!("Auto-answering '{}' with option {}", request.title, self.0);
        self.0
    }
}

fn parse_answer(line: &str) -> usize {
    match line.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => 0,
        _ => 1,
    }
}
