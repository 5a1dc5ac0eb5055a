//! The route back-end: forwards every operation to a slave PCM.
//!
//! The slave handle is cached in the back-end, so fast ops dispatch
//! straight to the slave's operation table without a per-call lookup or
//! re-validation. This is the skeleton a transforming plugin chain
//! hangs off; route itself converts nothing.

use ostinato_core::backend::{Backend, BackendSetup, BackendType, HwConfig, PcmInfo};
use ostinato_core::hw::HwParam;
use ostinato_core::link::LinkHandle;
use ostinato_core::{Error, Frames, HwParams, Mode, Pcm, Result, State, Status, SwParams};

pub struct RouteBackend {
    slave: Pcm,
}

/// Open a route PCM over an already opened slave.
pub fn open(name: impl Into<String>, slave: Pcm) -> Result<Pcm> {
    if slave.setup().is_some() {
        return Err(Error::Invalid("route slave must not be configured yet"));
    }
    let stream = slave.stream();
    let mode: Mode = slave.mode();
    let backend = RouteBackend { slave };
    Ok(Pcm::new(name, stream, mode, Box::new(backend)))
}

impl Backend for RouteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Route
    }

    fn info(&self) -> Result<PcmInfo> {
        let slave_info = self.slave.info()?;
        Ok(PcmInfo {
            backend: BackendType::Route,
            id: format!("route -> {}", slave_info.id),
            stream: self.slave.stream(),
        })
    }

    fn set_nonblock(&mut self, nonblock: bool) -> Result<()> {
        self.slave.set_nonblock(nonblock)
    }

    fn hw_refine(&self, space: &mut HwParams) -> Result<()> {
        self.slave.hw_refine(space)
    }

    fn hw_params(&mut self, config: &HwConfig) -> Result<BackendSetup> {
        // Pin the slave to the exact point chosen at this level.
        let mut space = self.slave.hw_params_any()?;
        space.set_access(config.access)?;
        space.set_format(config.format)?;
        space.set_subformat(config.subformat)?;
        space.set(HwParam::Channels, config.channels)?;
        space.set(HwParam::Rate, config.rate)?;
        space.set(HwParam::PeriodSize, config.period_size as u32)?;
        space.set(HwParam::BufferSize, config.buffer_size as u32)?;
        self.slave.hw_params(&mut space)?;

        let setup = self
            .slave
            .setup()
            .ok_or(Error::Invalid("slave lost its setup"))?;
        Ok(BackendSetup {
            ring: setup.ring_view(),
            rate_num: setup.rate_num,
            rate_den: setup.rate_den,
            msbits: setup.msbits,
            min_align: setup.min_align,
        })
    }

    fn hw_free(&mut self) -> Result<()> {
        self.slave.hw_free()
    }

    fn sw_params(&mut self, sw: &SwParams) -> Result<()> {
        self.slave.sw_params(sw)
    }

    fn dump(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        writeln!(out, "route PCM")?;
        writeln!(out, "slave:")?;
        self.slave.dump(out)
    }

    fn close(&mut self) -> Result<()> {
        self.slave.close()
    }

    fn state(&self) -> State {
        self.slave.backend_ref().state()
    }

    fn status(&self) -> Result<Status> {
        self.slave.backend_ref().status()
    }

    fn delay(&self) -> Result<i64> {
        self.slave.backend_ref().delay()
    }

    fn prepare(&mut self) -> Result<()> {
        self.slave.backend_mut().prepare()
    }

    fn reset(&mut self) -> Result<()> {
        self.slave.backend_mut().reset()
    }

    fn start(&mut self) -> Result<()> {
        self.slave.backend_mut().start()
    }

    fn drop_stream(&mut self) -> Result<()> {
        self.slave.backend_mut().drop_stream()
    }

    fn drain(&mut self) -> Result<()> {
        self.slave.backend_mut().drain()
    }

    fn pause(&mut self, enable: bool) -> Result<()> {
        self.slave.backend_mut().pause(enable)
    }

    fn rewind(&mut self, frames: Frames) -> Result<Frames> {
        self.slave.backend_mut().rewind(frames)
    }

    fn avail_update(&self) -> Result<Frames> {
        self.slave.backend_ref().avail_update()
    }

    fn writei(&mut self, buf: &[u8], frames: Frames) -> Result<Frames> {
        self.slave.backend_mut().writei(buf, frames)
    }

    fn writen(&mut self, bufs: &[&[u8]], offset: Frames, frames: Frames) -> Result<Frames> {
        self.slave.backend_mut().writen(bufs, offset, frames)
    }

    fn readi(&mut self, buf: &mut [u8], frames: Frames) -> Result<Frames> {
        self.slave.backend_mut().readi(buf, frames)
    }

    fn readn(&mut self, bufs: &mut [&mut [u8]], offset: Frames, frames: Frames) -> Result<Frames> {
        self.slave.backend_mut().readn(bufs, offset, frames)
    }

    fn mmap_commit(&mut self, offset: Frames, frames: Frames) -> Result<Frames> {
        self.slave.backend_mut().mmap_commit(offset, frames)
    }

    fn munmap(&mut self) -> Result<()> {
        self.slave.backend_mut().munmap()
    }

    fn link_descriptor(&self) -> Option<LinkHandle> {
        self.slave.backend_ref().link_descriptor()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl RouteBackend {
    /// The cached slave, for accessories such as the loopback clock.
    pub fn slave(&self) -> &Pcm {
        &self.slave
    }
}

/// Recover the slave of a route PCM.
pub fn slave_of(pcm: &Pcm) -> Option<&Pcm> {
    pcm.backend_any()
        .downcast_ref::<RouteBackend>()
        .map(|b| b.slave())
}
