//! Interactive URL / continue loop

use anyhow::Context;
use console::style;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::Result;

pub const URL_QUESTION: &str = "Entrez l'URL de la vidéo : ";

/// Asks questions on `writer` and reads one-line answers from `reader`
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
    affirmative: String,
}

impl<R, W> Prompter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, affirmative: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            affirmative: affirmative.into(),
        }
    }

    /// Print `question` and read the answer without its line ending
    ///
    /// Returns `None` at end of input.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.writer
            .write_all(style(question).bold().to_string().as_bytes())
            .await?;
        self.writer.flush().await?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .context("Failed to read from stdin")?;
        if read == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub async fn ask_url(&mut self) -> Result<Option<String>> {
        self.ask(URL_QUESTION).await
    }

    /// Ask whether to go on; only the affirmative token means yes
    pub async fn ask_continue(&mut self) -> Result<bool> {
        let question = format!("Voulez-vous extraire une autre vidéo ? ({}/non) : ", self.affirmative);
        let answer = self.ask(&question).await?;
        Ok(answer.is_some_and(|answer| is_affirmative(&answer, &self.affirmative)))
    }
}

/// Case-insensitive match against the affirmative token
pub fn is_affirmative(answer: &str, token: &str) -> bool {
    answer.trim().to_lowercase() == token.trim().to_lowercase()
}

/// Prompt for URLs until the user declines, handing each one to `handle`
///
/// A failed video is logged and the loop carries on to the continue prompt.
/// Returns the number of URLs handled.
pub async fn run_loop<R, W, F, Fut>(prompter: &mut Prompter<R, W>, mut handle: F) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut handled = 0;

    loop {
        let Some(url) = prompter.ask_url().await? else {
            tracing::debug!("End of input");
            break;
        };

        handled += 1;
        if let Err(e) = handle(url).await {
            tracing::error!("Video processing failed: {:#}", e);
        }

        if !prompter.ask_continue().await? {
            break;
        }
    }

    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn affirmative_is_case_insensitive() {
        assert!(is_affirmative("oui", "oui"));
        assert!(is_affirmative("OUI", "oui"));
        assert!(is_affirmative(" Oui ", "oui"));
        assert!(!is_affirmative("o", "oui"));
        assert!(!is_affirmative("yes", "oui"));
        assert!(!is_affirmative("", "oui"));
    }

    #[tokio::test]
    async fn affirmative_answer_reprompts() {
        let input: &[u8] = b"https://a.example/1\noui\nhttps://a.example/2\nnon\n";
        let mut output = Vec::new();
        let seen = RefCell::new(Vec::new());

        let mut prompter = Prompter::new(input, &mut output, "oui");
        let handled = run_loop(&mut prompter, |url| {
            seen.borrow_mut().push(url);
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert_eq!(handled, 2);
        assert_eq!(
            seen.into_inner(),
            vec!["https://a.example/1".to_string(), "https://a.example/2".to_string()]
        );
        let transcript = String::from_utf8_lossy(&output);
        assert_eq!(transcript.matches("Entrez l'URL").count(), 2);
    }

    #[tokio::test]
    async fn failure_still_reaches_continue_prompt() {
        let input: &[u8] = b"https://a.example/1\nOUI\nhttps://a.example/2\nnope\n";
        let mut output = Vec::new();

        let mut prompter = Prompter::new(input, &mut output, "oui");
        let handled = run_loop(&mut prompter, |_url| async { Err::<(), _>(anyhow::anyhow!("download failed")) })
            .await
            .unwrap();

        assert_eq!(handled, 2);
        assert_eq!(String::from_utf8_lossy(&output).matches("Voulez-vous").count(), 2);
    }

    #[tokio::test]
    async fn end_of_input_stops_loop() {
        let input: &[u8] = b"https://a.example/1\n";
        let mut output = Vec::new();

        let mut prompter = Prompter::new(input, &mut output, "oui");
        let handled = run_loop(&mut prompter, |_url| async { Ok(()) }).await.unwrap();
        assert_eq!(handled, 1);

        let input: &[u8] = b"";
        let mut prompter = Prompter::new(input, Vec::new(), "oui");
        let handled = run_loop(&mut prompter, |_url| async { Ok(()) }).await.unwrap();
        assert_eq!(handled, 0);
    }

    #[tokio::test]
    async fn reads_crlf_answers() {
        let reader = tokio::io::BufReader::new(
            tokio_test::io::Builder::new()
                .read(b"https://a.example/1\r\n")
                .build(),
        );
        let mut prompter = Prompter::new(reader, tokio::io::sink(), "oui");
        let answer = prompter.ask_url().await.unwrap();
        assert_eq!(answer.as_deref(), Some("https://a.example/1"));
    }
}
