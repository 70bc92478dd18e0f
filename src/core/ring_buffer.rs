//! Fixed-capacity framing ring buffers for real-time audio paths.
//!
//! [`AnalysisRingBuffer`] accepts arbitrarily sized writes and hands out
//! constant-length overlapping frames. [`SynthesisRingBuffer`] is its mirror
//! image: constant-length frames are overlap-added in and arbitrarily sized
//! blocks are read out.
//!
//! Neither buffer allocates after construction. Samples are stored channel
//! after channel in a single vector, one circular region per channel.

use super::index::RingIndex;

/// Ring buffer that turns an irregular write schedule into hop-spaced frames.
///
/// One slot is always kept free so that a full buffer can be told apart from
/// an empty one. The read pointer starts `proc_delay` samples behind the write
/// pointer, which pre-fills the buffer with that many zeros.
#[derive(Debug, Clone)]
pub struct AnalysisRingBuffer {
    data: Vec<f64>,
    buf_len: usize,
    win_len: usize,
    hop: usize,
    read_chan_stride: usize,
    num_chans: usize,
    read_idx: RingIndex,
    write_idx: RingIndex,
}

impl AnalysisRingBuffer {
    /// Creates an analysis buffer holding up to `fifo_len` samples per channel.
    ///
    /// `fifo_len` should be at least `win_len` plus the largest expected write.
    pub fn new(
        fifo_len: usize,
        proc_delay: usize,
        win_len: usize,
        hop: usize,
        num_chans: usize,
    ) -> Self {
        debug_check!(fifo_len > 0, "fifo_len must be positive");
        debug_check!(win_len > 0, "win_len must be positive");
        debug_check!(hop > 0, "hop must be positive");
        debug_check!(num_chans > 0, "num_chans must be positive");
        debug_check!(
            proc_delay + 1 >= win_len,
            "proc_delay must be at least win_len - 1"
        );
        debug_check!(fifo_len >= win_len, "fifo_len must be at least win_len");
        debug_check!(proc_delay <= fifo_len, "proc_delay must not exceed fifo_len");

        let buf_len = fifo_len + 1;
        let num_chans = num_chans.max(1);
        let proc_delay = proc_delay.min(fifo_len);
        Self {
            data: vec![0.0; num_chans * buf_len],
            buf_len,
            win_len,
            hop: hop.max(1),
            read_chan_stride: win_len,
            num_chans,
            read_idx: RingIndex::new(buf_len - proc_delay, buf_len),
            write_idx: RingIndex::new(0, buf_len),
        }
    }

    /// Zeroes the stored samples of every channel.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
    }

    /// Changes the read hop. Takes effect at the next [`read`](Self::read).
    pub fn set_hop(&mut self, hop: usize) {
        debug_check!(hop > 0, "hop must be positive");
        self.hop = hop.max(1);
    }

    /// Sets the distance between channels in the frame written by `read`.
    pub fn set_read_chan_stride(&mut self, stride: usize) {
        debug_check!(stride >= self.win_len, "stride must be at least win_len");
        self.read_chan_stride = stride.max(self.win_len);
    }

    /// Returns the current read hop.
    #[inline]
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Returns the frame length handed out by `read`.
    #[inline]
    pub fn win_len(&self) -> usize {
        self.win_len
    }

    /// Returns the number of channels the buffer was sized for.
    #[inline]
    pub fn num_chans(&self) -> usize {
        self.num_chans
    }

    /// Returns the distance between channels in the frame written by `read`.
    #[inline]
    pub fn read_chan_stride(&self) -> usize {
        self.read_chan_stride
    }

    /// Samples per channel waiting to be read.
    #[inline]
    pub fn available(&self) -> usize {
        self.read_idx.distance_to(self.write_idx)
    }

    /// Samples per channel that can still be written.
    #[inline]
    pub fn free_space(&self) -> usize {
        self.buf_len - 1 - self.available()
    }

    /// Writes up to `len` samples from each input channel.
    ///
    /// Only the first `num_chans` input channels are used; buffer channels
    /// without a matching input are zero-filled. Returns the number of
    /// samples written per channel, limited by the free space.
    pub fn write<'a, I>(&mut self, channels: I, len: usize) -> usize
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        if len == 0 {
            return 0;
        }

        let to_write = len.min(self.free_space());
        if to_write == 0 {
            return 0;
        }

        let (first, second) = self.write_idx.spans(to_write);
        let buf_len = self.buf_len;
        let mut channels = channels.into_iter();

        for w in 0..self.num_chans {
            let chan = &mut self.data[w * buf_len..(w + 1) * buf_len];
            match channels.next() {
                Some(input) => {
                    debug_check!(
                        input.len() >= to_write,
                        "input channel holds {} samples, {} requested",
                        input.len(),
                        to_write
                    );
                    copy_or_zero(&mut chan[first.clone()], input, 0);
                    copy_or_zero(&mut chan[second.clone()], input, first.len());
                }
                None => {
                    chan[first.clone()].fill(0.0);
                    chan[second.clone()].fill(0.0);
                }
            }
        }

        self.write_idx.advance(to_write);
        to_write
    }

    /// Copies one `win_len` frame per channel into `out`.
    ///
    /// Nothing happens and 0 is returned unless at least `max(win_len, hop)`
    /// samples are available. On success the read pointer moves by `hop`
    /// only, so consecutive frames overlap by `win_len - hop` samples.
    pub fn read(&mut self, out: &mut [f64]) -> usize {
        let available = self.available();
        if available < self.win_len || available < self.hop {
            return 0;
        }

        let needed = (self.num_chans - 1) * self.read_chan_stride + self.win_len;
        debug_check!(
            out.len() >= needed,
            "frame buffer holds {} samples, {} needed",
            out.len(),
            needed
        );
        if out.len() < needed {
            return 0;
        }

        let (first, second) = self.read_idx.spans(self.win_len);
        for w in 0..self.num_chans {
            let chan = &self.data[w * self.buf_len..(w + 1) * self.buf_len];
            let dst = &mut out[w * self.read_chan_stride..w * self.read_chan_stride + self.win_len];
            dst[..first.len()].copy_from_slice(&chan[first.clone()]);
            dst[first.len()..].copy_from_slice(&chan[second.clone()]);
        }

        self.read_idx.advance(self.hop);
        self.win_len
    }
}

/// Ring buffer that overlap-adds hop-spaced frames and releases them in
/// arbitrarily sized blocks.
///
/// Reading zeroes the consumed region so the next overlap-add starts from
/// silence. `win_len` extra slots are allocated to hold the tail of the
/// most recently written frame.
#[derive(Debug, Clone)]
pub struct SynthesisRingBuffer {
    data: Vec<f64>,
    buf_len: usize,
    win_len: usize,
    hop: usize,
    write_chan_stride: usize,
    num_chans: usize,
    read_idx: RingIndex,
    write_idx: RingIndex,
}

impl SynthesisRingBuffer {
    /// Creates a synthesis buffer for frames of `win_len` samples.
    pub fn new(fifo_len: usize, win_len: usize, hop: usize, num_chans: usize) -> Self {
        debug_check!(fifo_len > 0, "fifo_len must be positive");
        debug_check!(win_len > 0, "win_len must be positive");
        debug_check!(hop > 0, "hop must be positive");
        debug_check!(num_chans > 0, "num_chans must be positive");
        debug_check!(fifo_len >= win_len, "fifo_len must be at least win_len");

        let buf_len = fifo_len + win_len + 1;
        let num_chans = num_chans.max(1);
        Self {
            data: vec![0.0; num_chans * buf_len],
            buf_len,
            win_len,
            hop: hop.max(1),
            write_chan_stride: win_len,
            num_chans,
            read_idx: RingIndex::new(0, buf_len),
            write_idx: RingIndex::new(0, buf_len),
        }
    }

    /// Zeroes the stored samples of every channel.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
    }

    /// Changes the write hop. Takes effect at the next [`write`](Self::write).
    pub fn set_hop(&mut self, hop: usize) {
        debug_check!(hop > 0, "hop must be positive");
        self.hop = hop.max(1);
    }

    /// Sets the distance between channels in the frame passed to `write`.
    pub fn set_write_chan_stride(&mut self, stride: usize) {
        debug_check!(stride >= self.win_len, "stride must be at least win_len");
        self.write_chan_stride = stride.max(self.win_len);
    }

    /// Returns the current write hop.
    #[inline]
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Returns the frame length accepted by `write`.
    #[inline]
    pub fn win_len(&self) -> usize {
        self.win_len
    }

    /// Returns the number of channels the buffer was sized for.
    #[inline]
    pub fn num_chans(&self) -> usize {
        self.num_chans
    }

    /// Returns the distance between channels in the frame passed to `write`.
    #[inline]
    pub fn write_chan_stride(&self) -> usize {
        self.write_chan_stride
    }

    /// Completed samples per channel waiting to be read.
    #[inline]
    pub fn available(&self) -> usize {
        self.read_idx.distance_to(self.write_idx)
    }

    /// Slots per channel between the write pointer and the read pointer.
    #[inline]
    pub fn free_space(&self) -> usize {
        self.buf_len - 1 - self.available()
    }

    /// Returns true if a whole frame can be written right now.
    #[inline]
    pub fn can_write_frame(&self) -> bool {
        self.free_space() >= self.win_len
    }

    /// Overlap-adds one `win_len` frame per channel at the write pointer.
    ///
    /// The write is all or nothing: 0 is returned if the frame does not fit.
    /// On success the write pointer moves by `hop` and `win_len` is returned.
    pub fn write(&mut self, frame: &[f64]) -> usize {
        if !self.can_write_frame() {
            return 0;
        }

        let needed = (self.num_chans - 1) * self.write_chan_stride + self.win_len;
        debug_check!(
            frame.len() >= needed,
            "frame holds {} samples, {} needed",
            frame.len(),
            needed
        );
        if frame.len() < needed {
            return 0;
        }

        let (first, second) = self.write_idx.spans(self.win_len);
        for w in 0..self.num_chans {
            let chan = &mut self.data[w * self.buf_len..(w + 1) * self.buf_len];
            let src =
                &frame[w * self.write_chan_stride..w * self.write_chan_stride + self.win_len];
            let (head, tail) = src.split_at(first.len());
            for (acc, &s) in chan[first.clone()].iter_mut().zip(head) {
                *acc += s;
            }
            for (acc, &s) in chan[second.clone()].iter_mut().zip(tail) {
                *acc += s;
            }
        }

        self.write_idx.advance(self.hop);
        self.win_len
    }

    /// Reads up to `len` samples into each output channel.
    ///
    /// Copies `min(available, len)` samples into the first `num_chans` output
    /// channels and zeroes the consumed region in every buffer channel.
    /// Returns the number of samples read per channel.
    pub fn read<'a, I>(&mut self, len: usize, channels: I) -> usize
    where
        I: IntoIterator<Item = &'a mut [f64]>,
    {
        if len == 0 {
            return 0;
        }

        let to_read = len.min(self.available());
        if to_read == 0 {
            return 0;
        }

        let (first, second) = self.read_idx.spans(to_read);
        let buf_len = self.buf_len;
        let mut channels = channels.into_iter();

        for w in 0..self.num_chans {
            let chan = &mut self.data[w * buf_len..(w + 1) * buf_len];
            if let Some(out) = channels.next() {
                debug_check!(
                    out.len() >= to_read,
                    "output channel holds {} samples, {} requested",
                    out.len(),
                    to_read
                );
                let n1 = first.len().min(out.len());
                out[..n1].copy_from_slice(&chan[first.start..first.start + n1]);
                let n2 = second.len().min(out.len() - n1);
                out[n1..n1 + n2].copy_from_slice(&chan[..n2]);
            }
            chan[first.clone()].fill(0.0);
            chan[second.clone()].fill(0.0);
        }

        self.read_idx.advance(to_read);
        to_read
    }
}

/// Copies `dst.len()` samples from `src` starting at `offset`, zero-filling
/// whatever `src` cannot supply.
#[inline]
fn copy_or_zero(dst: &mut [f64], src: &[f64], offset: usize) {
    let avail = src.len().saturating_sub(offset).min(dst.len());
    dst[..avail].copy_from_slice(&src[offset..offset + avail]);
    dst[avail..].fill(0.0);
}
