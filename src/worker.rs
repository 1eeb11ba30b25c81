// Copyright (c) 2026 rezky_nightky

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::Configuration;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::render_loop::{Present, RenderLoop};
use crate::scheduler::FramePacer;
use crate::surface::Viewport;

/// Exclusive access to the output surface; only good for moving into `Init`.
pub struct SurfaceHandle<P> {
    presenter: P,
}

impl<P> SurfaceHandle<P> {
    pub fn new(presenter: P) -> Self {
        Self { presenter }
    }

    fn into_inner(self) -> P {
        self.presenter
    }
}

pub enum Message<P> {
    Init {
        surface: SurfaceHandle<P>,
        width: f32,
        height: f32,
        config: Configuration,
    },
    Resize {
        width: f32,
        height: f32,
    },
    UpdateConfig {
        config: Configuration,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct WorkerOptions {
    pub fps: f64,
    pub seed: Option<u64>,
    pub duration: Option<Duration>,
}

pub struct WorkerHandle<P> {
    tx: Option<Sender<Message<P>>>,
    join: Option<JoinHandle<io::Result<()>>>,
}

impl<P: Present + Send + 'static> WorkerHandle<P> {
    pub fn spawn(
        surface: SurfaceHandle<P>,
        viewport: Viewport,
        config: Configuration,
        options: WorkerOptions,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("driftfall-render".to_string())
            .spawn(move || run(rx, options))?;
        let handle = Self {
            tx: Some(tx),
            join: Some(join),
        };
        handle.send(Message::Init {
            surface,
            width: viewport.width,
            height: viewport.height,
            config,
        })?;
        Ok(handle)
    }

    fn send(&self, msg: Message<P>) -> Result<()> {
        self.tx
            .as_ref()
            .ok_or(Error::WorkerGone)?
            .send(msg)
            .map_err(|_| Error::WorkerGone)
    }

    pub fn resize(&self, viewport: Viewport) -> Result<()> {
        self.send(Message::Resize {
            width: viewport.width,
            height: viewport.height,
        })
    }

    pub fn update_config(&self, config: Configuration) -> Result<()> {
        self.send(Message::UpdateConfig { config })
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn shutdown(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.tx = None;
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        match join.join() {
            Ok(res) => res.map_err(Error::from),
            Err(_) => Err(Error::WorkerGone),
        }
    }
}

impl<P> Drop for WorkerHandle<P> {
    fn drop(&mut self) {
        self.tx = None;
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run<P: Present>(rx: Receiver<Message<P>>, options: WorkerOptions) -> io::Result<()> {
    let mut rl = loop {
        match rx.recv() {
            Ok(Message::Init {
                surface,
                width,
                height,
                config,
            }) => {
                let viewport = Viewport::new(width, height);
                let engine = match options.seed {
                    Some(seed) => Engine::with_seed(config, viewport, seed),
                    None => Engine::new(config, viewport),
                };
                break RenderLoop::new(
                    engine,
                    surface.into_inner(),
                    FramePacer::from_fps(options.fps),
                );
            }
            Ok(_) => log::warn!("worker message before init ignored"),
            Err(_) => return Ok(()),
        }
    };

    let started = Instant::now();
    let end = options.duration.map(|d| started + d);
    rl.start(started);
    log::debug!("render worker started");

    loop {
        // Drain everything queued so this tick sees the newest snapshot.
        loop {
            match rx.try_recv() {
                Ok(msg) => apply(&mut rl, msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("render worker disconnected");
                    return Ok(());
                }
            }
        }

        let now = Instant::now();
        if end.is_some_and(|end| now >= end) {
            log::debug!("render worker reached its duration");
            return Ok(());
        }
        match rl.until_next(now) {
            Some(wait) if wait.is_zero() => rl.tick(now)?,
            Some(wait) => match rx.recv_timeout(wait) {
                Ok(msg) => apply(&mut rl, msg),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            },
            None => return Ok(()),
        }
    }
}

fn apply<S, P>(rl: &mut RenderLoop<S, P>, msg: Message<P>)
where
    S: crate::scheduler::Scheduler,
    P: Present,
{
    match msg {
        Message::Init { .. } => log::warn!("duplicate worker init ignored"),
        Message::Resize { width, height } => rl.resize(Viewport::new(width, height)),
        Message::UpdateConfig { config } => rl.apply_config(config),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::ParticleKind;
    use crate::surface::Surface;

    #[derive(Debug, Default)]
    struct Seen {
        frames: usize,
        last_blank: bool,
        last_size: (usize, usize),
        dropped: bool,
    }

    struct Shared(Arc<Mutex<Seen>>);

    impl Present for Shared {
        fn present(&mut self, surface: &Surface) -> io::Result<()> {
            let mut s = self.0.lock().unwrap();
            s.frames += 1;
            s.last_blank = surface.is_blank();
            s.last_size = (surface.width(), surface.height());
            Ok(())
        }
    }

    impl Drop for Shared {
        fn drop(&mut self) {
            if let Ok(mut s) = self.0.lock() {
                s.dropped = true;
            }
        }
    }

    fn options() -> WorkerOptions {
        WorkerOptions {
            fps: 200.0,
            seed: Some(7),
            duration: None,
        }
    }

    fn wait_for(seen: &Arc<Mutex<Seen>>, cond: impl Fn(&Seen) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond(&seen.lock().unwrap()) {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn worker_renders_and_follows_config_updates() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let handle = WorkerHandle::spawn(
            SurfaceHandle::new(Shared(Arc::clone(&seen))),
            Viewport::new(64.0, 32.0),
            Configuration::default(),
            options(),
        )
        .unwrap();

        assert!(wait_for(&seen, |s| s.frames > 2 && s.last_blank));

        handle
            .update_config(Configuration {
                enabled: true,
                kind: ParticleKind::Snow,
                count: 200,
                ..Configuration::default()
            })
            .unwrap();
        assert!(wait_for(&seen, |s| !s.last_blank));

        handle.resize(Viewport::new(32.0, 16.0)).unwrap();
        assert!(wait_for(&seen, |s| s.last_size == (32, 16)));

        handle.shutdown().unwrap();
        assert!(seen.lock().unwrap().dropped);
    }

    #[test]
    fn dropping_the_handle_stops_the_worker() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let handle = WorkerHandle::spawn(
            SurfaceHandle::new(Shared(Arc::clone(&seen))),
            Viewport::new(16.0, 16.0),
            Configuration::default(),
            options(),
        )
        .unwrap();
        assert!(wait_for(&seen, |s| s.frames > 0));
        drop(handle);
        assert!(seen.lock().unwrap().dropped);
    }

    #[test]
    fn duration_ends_the_worker_and_later_sends_fail() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let handle = WorkerHandle::spawn(
            SurfaceHandle::new(Shared(Arc::clone(&seen))),
            Viewport::new(16.0, 16.0),
            Configuration::default(),
            WorkerOptions {
                duration: Some(Duration::from_millis(20)),
                ..options()
            },
        )
        .unwrap();
        assert!(wait_for(&seen, |s| s.dropped));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(handle.is_finished());
        assert!(matches!(
            handle.update_config(Configuration::default()),
            Err(Error::WorkerGone)
        ));
    }
}
