// Copyright (c) 2026 rezky_nightky

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use image::imageops::{self, FilterType};
use image::{GenericImageView, Rgba32FImage};

use crate::surface::Sprite;
use crate::texture::SPRITE_SIZE;

pub const RETRY_TICKS: u32 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageState {
    Empty,
    Pending,
    Ready,
    Failed,
}

type LoadResult = Result<(Sprite, (u32, u32)), image::ImageError>;

pub fn decode_sprite(path: &Path) -> LoadResult {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let dims = img.dimensions();

    let n = SPRITE_SIZE as u32;
    let mut scaled = img.resize(n, n, FilterType::Triangle).into_rgba32f();
    for px in scaled.pixels_mut() {
        let a = px[3];
        px[0] *= a;
        px[1] *= a;
        px[2] *= a;
    }

    let mut canvas = Rgba32FImage::new(n, n);
    let ox = (n - scaled.width()) / 2;
    let oy = (n - scaled.height()) / 2;
    imageops::replace(&mut canvas, &scaled, i64::from(ox), i64::from(oy));
    Ok((Sprite::new(canvas), dims))
}

#[derive(Debug)]
pub struct ImageSlot {
    path: Option<PathBuf>,
    state: ImageState,
    sprite: Option<Sprite>,
    dimensions: Option<(u32, u32)>,
    pending: Option<Receiver<LoadResult>>,
    retry_in: u32,
}

impl Default for ImageSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSlot {
    pub fn new() -> Self {
        Self {
            path: None,
            state: ImageState::Empty,
            sprite: None,
            dimensions: None,
            pending: None,
            retry_in: 0,
        }
    }

    pub fn request(&mut self, path: Option<&str>) {
        let wanted = path.map(PathBuf::from);
        if wanted == self.path {
            return;
        }
        self.path = wanted;
        self.sprite = None;
        self.dimensions = None;
        self.pending = None;
        self.state = ImageState::Empty;
        if self.path.is_some() {
            self.start_load();
        }
    }

    fn start_load(&mut self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("driftfall-image".to_string())
            .spawn(move || {
                let _ = tx.send(decode_sprite(&path));
            });
        match spawned {
            Ok(_) => {
                log::debug!("loading image {}", self.path_label());
                self.pending = Some(rx);
                self.state = ImageState::Pending;
            }
            Err(e) => {
                log::warn!("could not start image loader: {e}");
                self.fail();
            }
        }
    }

    fn fail(&mut self) {
        self.pending = None;
        self.state = ImageState::Failed;
        self.retry_in = RETRY_TICKS;
    }

    fn path_label(&self) -> String {
        self.path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    pub fn poll(&mut self) {
        match self.state {
            ImageState::Pending => {
                let Some(rx) = &self.pending else {
                    self.fail();
                    return;
                };
                match rx.try_recv() {
                    Ok(Ok((sprite, dims))) => {
                        log::debug!("image {} ready ({}x{})", self.path_label(), dims.0, dims.1);
                        self.sprite = Some(sprite);
                        self.dimensions = Some(dims);
                        self.pending = None;
                        self.state = ImageState::Ready;
                    }
                    Ok(Err(e)) => {
                        log::warn!("image {} failed to load: {e}", self.path_label());
                        self.fail();
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => self.fail(),
                }
            }
            ImageState::Failed => {
                self.retry_in = self.retry_in.saturating_sub(1);
                if self.retry_in == 0 {
                    self.start_load();
                }
            }
            ImageState::Empty | ImageState::Ready => {}
        }
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ImageState::Ready
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn sprite(&self) -> Option<&Sprite> {
        self.sprite.as_ref()
    }
}
