use docent_core::channel::{Channel, ChannelError, ChannelMessage};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

const INPUT_PROMPT: &str = "You: ";
const REPLY_PREFIX: &str = "Docent: ";

type Reader = Box<dyn AsyncRead + Unpin + Send>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

/// Line-oriented chat front end over stdin/stdout.
///
/// Each input line is one question. `exit`, `quit`, or EOF ends the session.
/// Blank lines are passed through so the agent can ask for a question.
pub struct CliChannel {
    lines: Lines<BufReader<Reader>>,
    out: Writer,
    prompt: bool,
}

impl std::fmt::Debug for CliChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliChannel")
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

impl CliChannel {
    /// Channel bound to the process stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }

    #[must_use]
    pub fn new(
        reader: impl AsyncRead + Unpin + Send + 'static,
        writer: impl AsyncWrite + Unpin + Send + 'static,
    ) -> Self {
        let reader: Reader = Box::new(reader);
        Self {
            lines: BufReader::new(reader).lines(),
            out: Box::new(writer),
            prompt: true,
        }
    }

    /// Disable the `You: ` input prompt (for piped input).
    #[must_use]
    pub fn without_prompt(mut self) -> Self {
        self.prompt = false;
        self
    }

    async fn write_flush(&mut self, text: &str) -> Result<(), ChannelError> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }
}

impl Channel for CliChannel {
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        if self.prompt {
            self.write_flush(INPUT_PROMPT).await?;
        }

        let Some(line) = self.lines.next_line().await? else {
            return Ok(None);
        };

        let trimmed = line.trim();
        if trimmed == "exit" || trimmed == "quit" {
            return Ok(None);
        }

        Ok(Some(ChannelMessage {
            text: trimmed.to_string(),
        }))
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        self.write_flush(&format!("{REPLY_PREFIX}{text}\n")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(input: &str) -> (CliChannel, tokio::io::DuplexStream) {
        let (writer, reader) = tokio::io::duplex(4096);
        let ch = CliChannel::new(std::io::Cursor::new(input.as_bytes().to_vec()), writer);
        (ch, reader)
    }

    async fn drain(mut out: tokio::io::DuplexStream, ch: CliChannel) -> String {
        use tokio::io::AsyncReadExt;
        drop(ch);
        let mut buf = String::new();
        out.read_to_string(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn reads_trimmed_lines_until_eof() {
        let (mut ch, out) = channel("  what is attention?  \nsecond\n");
        assert_eq!(ch.recv().await.unwrap().unwrap().text, "what is attention?");
        assert_eq!(ch.recv().await.unwrap().unwrap().text, "second");
        assert!(ch.recv().await.unwrap().is_none());

        let written = drain(out, ch).await;
        assert_eq!(written, "You: You: You: ");
    }

    #[tokio::test]
    async fn blank_line_is_passed_through() {
        let (mut ch, _out) = channel("   \n");
        let ch_msg = ch.recv().await.unwrap().unwrap();
        assert!(ch_msg.text.is_empty());
    }

    #[tokio::test]
    async fn exit_and_quit_end_the_session() {
        let (mut ch, _out) = channel("exit\nmore\n");
        assert!(ch.recv().await.unwrap().is_none());

        let (mut ch, _out) = channel(" quit \n");
        assert!(ch.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn send_prefixes_reply() {
        let (ch, out) = channel("");
        let mut ch = ch.without_prompt();
        ch.send("Attention relates positions.").await.unwrap();
        assert!(ch.recv().await.unwrap().is_none());

        let written = drain(out, ch).await;
        assert_eq!(written, "Docent: Attention relates positions.\n");
    }

    #[tokio::test]
    async fn debug_format() {
        let (ch, _out) = channel("");
        assert!(format!("{ch:?}").contains("CliChannel"));
    }
}
