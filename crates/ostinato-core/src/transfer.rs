//! The ring-buffer transfer engine: blocking/non-blocking read and
//! write loops, and the direct mmap window.
//!
//! The loops own alignment, waiting, and auto-start policy; the
//! back-end only moves frames at the current application position.
//! Partial progress always wins over a late error: once at least one
//! frame moved, the count is returned and the next call observes the
//! residual state.

use crate::area::ChannelArea;
use crate::error::{Error, Result};
use crate::format::Access;
use crate::pcm::Pcm;
use crate::state::{State, Stream};
use crate::Frames;

/// A contiguous window into the back-end ring.
///
/// `offset` is the application position modulo the buffer size; the
/// window never wraps, so `frames` is clamped to the buffer end as well
/// as to the available count. The caller owns the window exclusively
/// until it commits.
pub struct MmapWindow {
    pub areas: Vec<ChannelArea>,
    pub offset: Frames,
    pub frames: Frames,
}

enum WriteSrc<'a> {
    Interleaved(&'a [u8]),
    Channels(&'a [&'a [u8]]),
}

enum ReadDst<'a, 'b> {
    Interleaved(&'a mut [u8]),
    Channels(&'a mut [&'b mut [u8]]),
}

impl Pcm {
    /// Write interleaved frames. Returns the frames actually written;
    /// blocking mode waits for room, non-blocking reports `WouldBlock`.
    pub fn writei(&mut self, buf: &[u8], frames: Frames) -> Result<Frames> {
        self.check_rw("writei", Stream::Playback, Access::RwInterleaved)?;
        if self.frames_to_bytes(frames)? > buf.len() as u64 {
            return Err(Error::Invalid("buffer shorter than frame count"));
        }
        self.write_loop(WriteSrc::Interleaved(buf), frames)
    }

    /// Write non-interleaved frames, one buffer per channel.
    pub fn writen(&mut self, bufs: &[&[u8]], frames: Frames) -> Result<Frames> {
        self.check_rw("writen", Stream::Playback, Access::RwNoninterleaved)?;
        self.check_channel_bufs(bufs.len(), bufs.iter().map(|b| b.len()), frames)?;
        self.write_loop(WriteSrc::Channels(bufs), frames)
    }

    /// Read interleaved frames. Returns the frames actually read.
    pub fn readi(&mut self, buf: &mut [u8], frames: Frames) -> Result<Frames> {
        self.check_rw("readi", Stream::Capture, Access::RwInterleaved)?;
        if self.frames_to_bytes(frames)? > buf.len() as u64 {
            return Err(Error::Invalid("buffer shorter than frame count"));
        }
        self.read_loop(ReadDst::Interleaved(buf), frames)
    }

    /// Read non-interleaved frames, one buffer per channel.
    pub fn readn(&mut self, bufs: &mut [&mut [u8]], frames: Frames) -> Result<Frames> {
        self.check_rw("readn", Stream::Capture, Access::RwNoninterleaved)?;
        self.check_channel_bufs(bufs.len(), bufs.iter().map(|b| b.len()), frames)?;
        self.read_loop(ReadDst::Channels(bufs), frames)
    }

    fn check_rw(&self, op: &'static str, stream: Stream, access: Access) -> Result<()> {
        let setup = self.setup_ref(op)?;
        if self.stream != stream {
            return Err(Error::Invalid("transfer direction mismatch"));
        }
        if setup.access != access {
            return Err(Error::Invalid("transfer entry point does not match access mode"));
        }
        Ok(())
    }

    fn check_channel_bufs(
        &self,
        count: usize,
        lens: impl Iterator<Item = usize>,
        frames: Frames,
    ) -> Result<()> {
        let setup = self.setup_ref("channel buffers")?;
        if count != setup.channels as usize {
            return Err(Error::Invalid("channel buffer count mismatch"));
        }
        let need_bits = frames * setup.sample_bits as u64;
        for len in lens {
            if (len as u64) * 8 < need_bits {
                return Err(Error::Invalid("channel buffer shorter than frame count"));
            }
        }
        Ok(())
    }

    fn write_loop(&mut self, src: WriteSrc<'_>, mut size: Frames) -> Result<Frames> {
        if size == 0 {
            return Ok(0);
        }
        let (xfer_align, start_threshold, buffer_size, frame_bytes) = {
            let s = self.setup_ref("writei")?;
            (
                s.sw.xfer_align,
                s.sw.start_threshold,
                s.buffer_size,
                (s.frame_bits / 8) as u64,
            )
        };
        if size > xfer_align {
            size -= size % xfer_align;
        }
        let mut state = self.state();
        match state {
            State::Prepared | State::Running => {}
            State::Xrun => return Err(Error::Underrun),
            s => return Err(Error::BadState { op: "write", state: s }),
        }

        let mut xfer: Frames = 0;
        let mut err = None;
        while size > 0 {
            let avail = match self.backend.avail_update() {
                Ok(a) => a,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            };
            if state == State::Prepared && avail == 0 {
                // Full buffer with nothing consuming it.
                err = Some(Error::Underrun);
                break;
            }
            if avail == 0 || (size >= xfer_align && avail < xfer_align) {
                if self.mode.nonblock {
                    err = Some(Error::WouldBlock);
                    break;
                }
                if let Err(e) = self.block_for_progress(size, xfer_align) {
                    err = Some(e);
                    break;
                }
                state = self.state();
                match state {
                    State::Prepared | State::Running => continue,
                    State::Xrun => {
                        err = Some(Error::Underrun);
                        break;
                    }
                    s => {
                        err = Some(Error::BadState { op: "write", state: s });
                        break;
                    }
                }
            }
            let mut avail = avail;
            if avail > xfer_align {
                avail -= avail % xfer_align;
            }
            let frames = size.min(avail);
            debug_assert!(frames > 0);
            let done = match &src {
                WriteSrc::Interleaved(buf) => {
                    let off = (xfer * frame_bytes) as usize;
                    self.backend.writei(&buf[off..], frames)
                }
                WriteSrc::Channels(bufs) => self.backend.writen(bufs, xfer, frames),
            };
            let done = match done {
                Ok(d) => d,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            };
            debug_assert_eq!(done, frames);
            size -= done;
            xfer += done;

            if state == State::Prepared {
                let hw_avail = buffer_size - avail + done;
                if hw_avail >= start_threshold {
                    if let Err(e) = self.backend.start() {
                        err = Some(e);
                        break;
                    }
                    state = State::Running;
                }
            }
        }
        finish(xfer, err)
    }

    fn read_loop(&mut self, mut dst: ReadDst<'_, '_>, mut size: Frames) -> Result<Frames> {
        if size == 0 {
            return Ok(0);
        }
        let (xfer_align, start_threshold, frame_bytes) = {
            let s = self.setup_ref("readi")?;
            (s.sw.xfer_align, s.sw.start_threshold, (s.frame_bits / 8) as u64)
        };
        if size > xfer_align {
            size -= size % xfer_align;
        }
        let mut state = self.state();
        match state {
            State::Prepared => {
                if size >= start_threshold {
                    self.backend.start()?;
                    state = State::Running;
                }
            }
            State::Running | State::Draining => {}
            State::Xrun => return Err(Error::Overrun),
            s => return Err(Error::BadState { op: "read", state: s }),
        }

        let mut xfer: Frames = 0;
        let mut err = None;
        while size > 0 {
            let avail = match self.backend.avail_update() {
                Ok(a) => a,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            };
            if state == State::Draining && avail == 0 {
                // The residue is exhausted.
                err = Some(Error::Overrun);
                break;
            }
            if avail == 0 || (size >= xfer_align && avail < xfer_align) {
                if self.mode.nonblock {
                    err = Some(Error::WouldBlock);
                    break;
                }
                if let Err(e) = self.block_for_progress(size, xfer_align) {
                    err = Some(e);
                    break;
                }
                state = self.state();
                match state {
                    State::Prepared | State::Running | State::Draining => continue,
                    State::Xrun => {
                        err = Some(Error::Overrun);
                        break;
                    }
                    s => {
                        err = Some(Error::BadState { op: "read", state: s });
                        break;
                    }
                }
            }
            let mut avail = avail;
            if avail > xfer_align {
                avail -= avail % xfer_align;
            }
            let frames = size.min(avail);
            debug_assert!(frames > 0);
            let done = match &mut dst {
                ReadDst::Interleaved(buf) => {
                    let off = (xfer * frame_bytes) as usize;
                    self.backend.readi(&mut buf[off..], frames)
                }
                ReadDst::Channels(bufs) => self.backend.readn(bufs, xfer, frames),
            };
            let done = match done {
                Ok(d) => d,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            };
            debug_assert_eq!(done, frames);
            size -= done;
            xfer += done;
        }
        finish(xfer, err)
    }

    /// Block on the poll descriptor until the back-end reports progress.
    /// Clears readiness first and re-checks availability to close the
    /// race against a concurrent pointer update.
    fn block_for_progress(&mut self, size: Frames, xfer_align: Frames) -> Result<()> {
        let poll = self.poll_clone("transfer")?;
        poll.clear();
        let avail = self.backend.avail_update()?;
        if avail == 0 || (size >= xfer_align && avail < xfer_align) {
            poll.wait(None);
        }
        Ok(())
    }

    // --- direct access ----------------------------------------------

    /// Open a window into the ring at the application position.
    ///
    /// The window is contiguous: `frames` is clamped to the requested
    /// count, the available count, and the distance to the buffer end.
    pub fn mmap_begin(&mut self, frames: Frames) -> Result<MmapWindow> {
        let (areas, appl, buffer_size) = {
            let s = self.setup_ref("mmap_begin")?;
            (
                s.backend_setup.ring.running.clone(),
                s.backend_setup.ring.appl.get(),
                s.buffer_size,
            )
        };
        let avail = self.backend.avail_update()?;
        let offset = appl % buffer_size;
        let cont = buffer_size - offset;
        let frames = frames.min(avail).min(cont);
        self.pending_mmap = Some((offset, frames));
        Ok(MmapWindow {
            areas,
            offset,
            frames,
        })
    }

    /// Commit a window obtained from [`mmap_begin`](Self::mmap_begin):
    /// advance the application pointer by `frames` and, on playback,
    /// auto-start once the queued count reaches the start threshold.
    pub fn mmap_commit(&mut self, offset: Frames, frames: Frames) -> Result<Frames> {
        let (appl, buffer_size, start_threshold) = {
            let s = self.setup_ref("mmap_commit")?;
            (
                s.backend_setup.ring.appl.get(),
                s.buffer_size,
                s.sw.start_threshold,
            )
        };
        if offset != appl % buffer_size {
            return Err(Error::Invalid("mmap_commit offset does not match appl_ptr"));
        }
        if let Some((begun_offset, begun_frames)) = self.pending_mmap {
            if offset != begun_offset || frames > begun_frames {
                return Err(Error::Invalid("mmap_commit does not match mmap_begin window"));
            }
        }
        let avail = self.backend.avail_update()?;
        if frames > avail {
            return Err(Error::Invalid("mmap_commit beyond available frames"));
        }
        let committed = self.backend.mmap_commit(offset, frames)?;
        self.pending_mmap = None;

        if self.stream == Stream::Playback && self.backend.state() == State::Prepared {
            let hw_avail = buffer_size - (avail - committed);
            if hw_avail >= start_threshold {
                self.backend.start()?;
            }
        }
        Ok(committed)
    }
}

fn finish(xfer: Frames, err: Option<Error>) -> Result<Frames> {
    if xfer > 0 {
        Ok(xfer)
    } else {
        Err(err.unwrap_or(Error::Invalid("empty transfer")))
    }
}
