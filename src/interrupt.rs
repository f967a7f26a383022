//! Ctrl-C plumbing for the REPL.
//!
//! Installing a SIGINT listener disables the default terminate behaviour for
//! the rest of the process, so a single listener feeds every place that has
//! to react to Ctrl-C: the prompt and any in-flight reply.

use std::io;

use tokio::io::{AsyncBufRead, Lines};
use tokio::signal;
use tokio::sync::watch;
use tracing::warn;

/// Receiving side: wakes once per press.
#[derive(Debug, Clone)]
pub struct Interrupts {
    presses: watch::Receiver<u64>,
}

/// Sending side, held by the signal task.
#[derive(Debug)]
pub struct InterruptTrigger {
    presses: watch::Sender<u64>,
}

pub fn channel() -> (InterruptTrigger, Interrupts) {
    let (sender, receiver) = watch::channel(0_u64);
    (
        InterruptTrigger { presses: sender },
        Interrupts { presses: receiver },
    )
}

impl InterruptTrigger {
    pub fn press(&self) {
        self.presses.send_modify(|count| *count += 1);
    }
}

impl Interrupts {
    /// Spawns the process-wide Ctrl-C listener. Requires a tokio runtime.
    pub fn listen_for_ctrl_c() -> Self {
        let (trigger, interrupts) = channel();
        tokio::spawn(async move {
            while signal::ctrl_c().await.is_ok() {
                trigger.press();
            }
            warn!("Ctrl-C handling unavailable");
        });
        interrupts
    }

    /// Resolves on the next press not yet observed.
    ///
    /// Never resolves once the trigger is gone.
    pub async fn pressed(&mut self) {
        if self.presses.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// One read at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Line(String),
    Eof,
    Interrupted,
}

/// Reads the next line unless Ctrl-C arrives first.
pub async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupts: &mut Interrupts,
) -> io::Result<PromptInput>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?.map_or(PromptInput::Eof, PromptInput::Line)),
        _ = interrupts.pressed() => Ok(PromptInput::Interrupted),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::*;

    #[tokio::test]
    async fn lines_and_eof_pass_through() {
        let (_trigger, mut interrupts) = channel();
        let mut lines = BufReader::new(&b"flat white\n"[..]).lines();

        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.expect("read"),
            PromptInput::Line("flat white".to_string())
        );
        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.expect("read"),
            PromptInput::Eof
        );
    }

    #[tokio::test]
    async fn press_at_an_idle_prompt_interrupts_the_read() {
        let (trigger, mut interrupts) = channel();
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        trigger.press();

        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.expect("read"),
            PromptInput::Interrupted
        );
    }

    #[tokio::test]
    async fn press_after_an_earlier_interrupted_reply_still_reaches_the_prompt() {
        let (trigger, mut interrupts) = channel();
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        // First press is consumed by a streaming reply.
        trigger.press();
        interrupts.pressed().await;

        writer.write_all(b"next order\n").await.expect("write");
        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.expect("read"),
            PromptInput::Line("next order".to_string())
        );

        trigger.press();
        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.expect("read"),
            PromptInput::Interrupted
        );
    }

    #[tokio::test]
    async fn dropped_trigger_never_fires() {
        let (trigger, mut interrupts) = channel();
        drop(trigger);

        let waited = tokio::time::timeout(Duration::from_millis(20), interrupts.pressed()).await;
        assert!(waited.is_err());
    }
}
