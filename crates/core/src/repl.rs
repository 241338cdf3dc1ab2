use crate::agent::Respond;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const QUIT_COMMAND: &str = "q";
pub const PROMPT: &str = "- ";

/// Reads one line per turn until `q` or end of input.
///
/// Every other line, including an empty one, is handed to `agent`. A failed
/// turn prints its explanation and the loop keeps going. Returns the number
/// of turns that reached the agent.
pub async fn run_repl<A, R, W>(agent: &mut A, mut input: R, output: &mut W) -> std::io::Result<usize>
where
    A: Respond + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut turns = 0;
    let mut line = String::new();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            break;
        }
        let prompt = line.trim_end_matches(['\n', '\r']);
        if prompt == QUIT_COMMAND {
            break;
        }

        output.write_all(b"Thinking...\n").await?;
        turns += 1;
        let block = match agent.respond(prompt).await {
            Ok(text) => format!("\n{text}\n\n"),
            Err(error) => format!("{}\n\n", error.explain()),
        };
        output.write_all(block.as_bytes()).await?;
        output.flush().await?;
    }

    Ok(turns)
}
