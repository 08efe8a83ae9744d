use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LLMError;
use crate::provider::ChatStream;
use crate::types::ChatMessage;

/// Alias for the word-fragment stream produced by [`rechunk_to_words`].
pub type WordStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

/// Re-chunks a stream of text deltas to be word-by-word.
///
/// Streaming backends segment text at arbitrary points, often mid-word, and a
/// speech synthesizer fed such fragments mispronounces the split words. This
/// adapter buffers deltas only as far as the next word boundary and emits
/// maximal whitespace-free words as soon as they are complete.
///
/// Spaces are included with the *next* word, so `"foo bar baz"` is emitted as
/// `"foo"`, `" bar"`, `" baz"`. Any run of whitespace characters, of any kind,
/// collapses to the single leading space of the following word. A stream that
/// begins with whitespace therefore yields its first word with one leading
/// space; concatenating all fragments reconstructs the input with whitespace
/// runs normalized to single spaces.
///
/// Evaluation is pull-based: nothing is read from the upstream stream until
/// the consumer asks for the next fragment, and dropping the rechunker drops
/// the upstream stream with it, cancelling the request. An upstream error is
/// forwarded unchanged and ends the output sequence; fragments already emitted
/// stay valid. A stream with no whitespace at all is buffered in full until it
/// ends, then emitted as one fragment; no bound is enforced on that buffer.
pub struct WordRechunker<S> {
    upstream: S,
    buffer: String,
    prefix: &'static str,
    done: bool,
}

/// Builds a [`WordRechunker`] over any stream of text deltas.
///
/// # Examples
///
/// ```
/// use futures_util::{StreamExt, stream};
/// use sotto_llm::rechunk::rechunk_to_words;
/// use sotto_llm::LLMError;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let deltas = stream::iter(
///     ["foo", " ba", "r ", "baz"].map(|d| Ok::<_, LLMError>(d.to_string())),
/// );
/// let words: Vec<String> = rechunk_to_words(deltas)
///     .map(|word| word.unwrap())
///     .collect()
///     .await;
/// assert_eq!(words, ["foo", " bar", " baz"]);
/// # });
/// ```
pub fn rechunk_to_words<S, E>(deltas: S) -> WordRechunker<S>
where
    S: Stream<Item = Result<String, E>> + Unpin,
{
    WordRechunker {
        upstream: deltas,
        buffer: String::new(),
        prefix: "",
        done: false,
    }
}

/// Runs a chat completion and re-chunks its deltas into word fragments.
///
/// Convenience for the common pipeline: backend → [`WordRechunker`] → speech
/// synthesis frontend.
///
/// # Errors
///
/// Forwards the error raised by [`ChatStream::chat_completion`].
pub async fn stream_words(
    backend: &dyn ChatStream,
    messages: &[ChatMessage],
) -> Result<WordStream, LLMError> {
    let deltas = backend.chat_completion(messages).await?;
    Ok(Box::pin(rechunk_to_words(deltas)))
}

impl<S> WordRechunker<S> {
    /// Cuts the next complete word off the front of the buffer.
    ///
    /// Scans for the first maximal whitespace run. Text before the run becomes
    /// the next fragment; the run itself is dropped and the prefix for every
    /// later fragment becomes a single space. A run with nothing before it
    /// (leading or consecutive whitespace) emits no fragment but still sets
    /// the prefix, which is what collapses repeated whitespace. Returns `None`
    /// when no whitespace run remains, leaving a partial word buffered.
    fn cut_word(&mut self) -> Option<String> {
        loop {
            let start = self.buffer.find(char::is_whitespace)?;
            let tail = &self.buffer[start..];
            let end = start
                + tail
                    .find(|c: char| !c.is_whitespace())
                    .unwrap_or(tail.len());

            let word = if start == 0 {
                None
            } else {
                Some(format!("{}{}", self.prefix, &self.buffer[..start]))
            };
            self.buffer.drain(..end);
            self.prefix = " ";

            if let Some(word) = word {
                return Some(word);
            }
        }
    }
}

impl<S, E> Stream for WordRechunker<S>
where
    S: Stream<Item = Result<String, E>> + Unpin,
{
    type Item = Result<String, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(word) = this.cut_word() {
                return Poll::Ready(Some(Ok(word)));
            }

            if this.done {
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                let tail = std::mem::take(&mut this.buffer);
                return Poll::Ready(Some(Ok(format!("{}{tail}", this.prefix))));
            }

            match Pin::new(&mut this.upstream).poll_next(cx) {
                Poll::Ready(Some(Ok(delta))) => this.buffer.push_str(&delta),
                Poll::Ready(Some(Err(err))) => {
                    this.done = true;
                    this.buffer.clear();
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
