//! `RawChannelReader`/`RawChannelWriter` (§4.7): a single `stream_id`'s
//! worth of `StreamDataMessage` traffic, presented as a byte stream. Each
//! side owns its own lock, matching §5's "each ... Reader/Writer owns its
//! own reentrant lock"; blocking reads wait on a condition variable rather
//! than spinning.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use channel::Channel;

use crate::error::{Result, ResourceError};
use crate::stream::StreamDataMessage;

type ReadyCallback = Box<dyn Fn(usize) + Send + Sync>;

struct ReaderState {
    buffer: VecDeque<u8>,
    eof: bool,
    callbacks: Vec<ReadyCallback>,
}

/// The read half of one stream: accumulates inbound `StreamDataMessage`
/// chunks for `stream_id` into a byte buffer, in arrival order (Channel has
/// already deduplicated and ordered them by the time they reach here).
pub struct RawChannelReader {
    stream_id: u16,
    state: Mutex<ReaderState>,
    ready: Condvar,
}

impl RawChannelReader {
    pub fn new(stream_id: u16) -> Arc<Self> {
        Arc::new(RawChannelReader {
            stream_id,
            state: Mutex::new(ReaderState { buffer: VecDeque::new(), eof: false, callbacks: Vec::new() }),
            ready: Condvar::new(),
        })
    }

    pub fn stream_id(&self) -> u16 {
        self.stream_id
    }

    /// Feeds one inbound message. Messages for other stream ids are
    /// ignored, since a single Channel's system handler fans every
    /// `StreamDataMessage` out to every registered reader.
    pub fn on_inbound(&self, msg: &StreamDataMessage) {
        if msg.stream_id != self.stream_id {
            return;
        }
        let mut state = self.state.lock().expect("raw reader mutex poisoned");
        state.buffer.extend(msg.data.iter().copied());
        if msg.eof {
            state.eof = true;
        }
        let len = state.buffer.len();
        self.ready.notify_all();
        for cb in &state.callbacks {
            cb(len);
        }
    }

    pub fn add_ready_callback(&self, cb: impl Fn(usize) + Send + Sync + 'static) {
        self.state.lock().expect("raw reader mutex poisoned").callbacks.push(Box::new(cb));
    }

    /// Returns up to `n` bytes, blocking until at least one byte is
    /// available. Returns `None` only once the buffer is drained and EOF
    /// has been observed (§4.7: "returning None to signal EOF-with-empty-
    /// buffer").
    pub fn read(&self, n: usize) -> Option<Vec<u8>> {
        let mut state = self.state.lock().expect("raw reader mutex poisoned");
        loop {
            if !state.buffer.is_empty() {
                let take = n.min(state.buffer.len());
                return Some(state.buffer.drain(..take).collect());
            }
            if state.eof {
                return None;
            }
            state = self.ready.wait(state).expect("raw reader mutex poisoned");
        }
    }

    /// Blocks until `delim` appears in the buffer or EOF is reached,
    /// returning everything up to and including `delim` (or the remaining
    /// tail on EOF). Backs `BufferedReader::read_line`.
    pub fn read_until(&self, delim: u8) -> Option<Vec<u8>> {
        let mut state = self.state.lock().expect("raw reader mutex poisoned");
        loop {
            if let Some(pos) = state.buffer.iter().position(|&b| b == delim) {
                return Some(state.buffer.drain(..=pos).collect());
            }
            if state.eof {
                if state.buffer.is_empty() {
                    return None;
                }
                return Some(state.buffer.drain(..).collect());
            }
            state = self.ready.wait(state).expect("raw reader mutex poisoned");
        }
    }

    pub fn is_eof(&self) -> bool {
        let state = self.state.lock().expect("raw reader mutex poisoned");
        state.eof && state.buffer.is_empty()
    }
}

/// The write half of one stream: splits outbound bytes into
/// `StreamDataMessage::max_data_len`-sized chunks and sends each over
/// `channel` as a system message.
pub struct RawChannelWriter {
    stream_id: u16,
    channel: Arc<Channel>,
}

impl RawChannelWriter {
    pub fn new(stream_id: u16, channel: Arc<Channel>) -> Self {
        RawChannelWriter { stream_id, channel }
    }

    pub fn stream_id(&self) -> u16 {
        self.stream_id
    }

    pub fn mdu(&self) -> usize {
        self.channel.mdu()
    }

    /// Splits `data` into MDU-sized chunks and sends each in turn, blocking
    /// between chunks until the Channel's one-in-flight envelope clears.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let max_len = StreamDataMessage::max_data_len(self.channel.mdu()).max(1);
        for chunk in data.chunks(max_len) {
            let msg = StreamDataMessage::new(self.stream_id, false, chunk.to_vec())?;
            self.send_blocking(&msg)?;
        }
        Ok(())
    }

    /// Sends an empty chunk with the EOF flag set (§4.7).
    pub fn close(&self) -> Result<()> {
        let msg = StreamDataMessage::new(self.stream_id, true, Vec::new())?;
        self.send_blocking(&msg)
    }

    /// Retries `channel.send` while the channel reports a prior envelope
    /// still in flight; the Channel itself owns the actual retry/ack
    /// machinery via the underlying Link receipt, this just waits for a
    /// send slot to free up.
    fn send_blocking(&self, msg: &StreamDataMessage) -> Result<()> {
        loop {
            match self.channel.send(msg) {
                Ok(_) => return Ok(()),
                Err(channel::ChannelError::LinkNotReady) => {
                    std::thread::sleep(Duration::from_millis(5));
                    continue;
                }
                Err(channel::ChannelError::Closed) => return Err(ResourceError::Cancelled),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn reassembles_chunks_in_order() {
        let reader = RawChannelReader::new(7);
        reader.on_inbound(&StreamDataMessage::new(7, false, b"hello ".to_vec()).unwrap());
        reader.on_inbound(&StreamDataMessage::new(7, false, b"world".to_vec()).unwrap());
        reader.on_inbound(&StreamDataMessage::new(7, true, Vec::new()).unwrap());

        let mut collected = Vec::new();
        loop {
            match reader.read(4096) {
                Some(chunk) => collected.extend(chunk),
                None => break,
            }
        }
        assert_eq!(collected, b"hello world");
    }

    #[test]
    fn ignores_messages_for_other_stream_ids() {
        let reader = RawChannelReader::new(1);
        reader.on_inbound(&StreamDataMessage::new(2, false, b"not mine".to_vec()).unwrap());
        reader.on_inbound(&StreamDataMessage::new(1, true, b"mine".to_vec()).unwrap());

        assert_eq!(reader.read(4096).unwrap(), b"mine");
        assert!(reader.read(4096).is_none());
    }

    #[test]
    fn ready_callback_fires_with_current_length() {
        let reader = RawChannelReader::new(3);
        let (tx, rx) = mpsc::channel();
        reader.add_ready_callback(move |len| tx.send(len).unwrap());

        reader.on_inbound(&StreamDataMessage::new(3, false, b"abc".to_vec()).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 3);
    }

    #[test]
    fn read_until_splits_on_delimiter() {
        let reader = RawChannelReader::new(9);
        reader.on_inbound(&StreamDataMessage::new(9, false, b"line one\nline two".to_vec()).unwrap());
        reader.on_inbound(&StreamDataMessage::new(9, true, Vec::new()).unwrap());

        assert_eq!(reader.read_until(b'\n').unwrap(), b"line one\n");
        assert_eq!(reader.read_until(b'\n').unwrap(), b"line two");
        assert!(reader.read_until(b'\n').is_none());
    }
}
