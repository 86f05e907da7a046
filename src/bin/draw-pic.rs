extern crate agitools;

use agitools::palette;
use agitools::picture::PicturePrinter;
use agitools::rasterizer::{self, PictureRasterizer};
use agitools::restype::{ResourceID, ResourceType};
use agitools::storage::DirectorySource;
use agitools::tracer::{PICTURE_HEIGHT, PICTURE_WIDTH};
use agitools::volume::{Volume, VolumeError};
use gif::Encoder;
use log::{info, warn};
use std::env;
use std::fs::File;
use std::io::Write;

#[derive(Debug)]
pub enum DrawError {
    IoError(std::io::Error),
    Volume(VolumeError),
    Gif(gif::EncodingError),
    InvalidNumber(String),
}

impl From<std::io::Error> for DrawError {
    fn from(error: std::io::Error) -> Self {
       DrawError::IoError(error)
    }
}

impl From<VolumeError> for DrawError {
    fn from(error: VolumeError) -> Self {
       DrawError::Volume(error)
    }
}

impl From<gif::EncodingError> for DrawError {
    fn from(error: gif::EncodingError) -> Self {
       DrawError::Gif(error)
    }
}

fn write_gif(fname: &str, bits: &[u8]) -> Result<(), DrawError> {
    let palette = palette::ega_palette();
    let gif_file = File::create(fname)?;
    let mut encoder = Encoder::new(gif_file, PICTURE_WIDTH as u16, PICTURE_HEIGHT as u16, &palette)?;
    let frame = gif::Frame::from_indexed_pixels(PICTURE_WIDTH as u16, PICTURE_HEIGHT as u16, bits, None);
    encoder.write_frame(&frame)?;
    info!("wrote {}", fname);
    Ok(())
}

fn draw_picture(engine_version: u16, pic_data: &[u8], prefix: &str) -> Result<(), DrawError> {
    let (visual, priority) = PictureRasterizer::render(engine_version, pic_data);
    let (effective_priority, control) = rasterizer::split_priority_and_control(&priority);

    write_gif(&format!("{}visual.gif", prefix), &visual)?;
    write_gif(&format!("{}priority.gif", prefix), &priority)?;
    write_gif(&format!("{}priority-split.gif", prefix), &effective_priority)?;
    write_gif(&format!("{}control.gif", prefix), &control)?;
    Ok(())
}

fn draw_all(volume: &Volume<DirectorySource>, out_path: &str) -> Result<(), DrawError> {
    std::fs::create_dir_all(out_path)?;
    let mut info_file = File::create(format!("{}/info.txt", out_path))?;
    write!(info_file, "{}", volume.info())?;

    let engine_version = volume.info().engine_version;
    for num in volume.resource_ids(ResourceType::Picture) {
        let id = ResourceID{ rtype: ResourceType::Picture, num };
        let pic_data = match volume.load(ResourceType::Picture, num) {
            Ok(data) => data,
            Err(e) => {
                warn!("{}: {}, skipping", id, e);
                continue
            }
        };

        let prefix = format!("{}/{}.", out_path, id);
        let mut listing = File::create(format!("{}txt", prefix))?;
        write!(listing, "{}", PicturePrinter::new(&pic_data, true))?;
        draw_picture(engine_version, &pic_data, &prefix)?;
    }
    Ok(())
}

fn main() -> Result<(), DrawError> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let valid = match args.len() {
        3 => args[2] != "--all",
        4 => args[2] == "--all" || args[3] == "--list",
        _ => false
    };
    if !valid {
        eprintln!("usage: {} game-directory picture-number [--list]", args[0]);
        eprintln!("       {} game-directory --all output-directory", args[0]);
        std::process::exit(1);
    }

    let volume = Volume::open(DirectorySource::new(&args[1]))?;
    if args[2] == "--all" {
        return draw_all(&volume, &args[3])
    }

    let pic_num: u16 = args[2].parse().map_err(|_| DrawError::InvalidNumber(args[2].clone()))?;
    let pic_data = volume.load(ResourceType::Picture, pic_num)?;
    if args.len() == 4 {
        print!("{}", PicturePrinter::new(&pic_data, true));
    }
    draw_picture(volume.info().engine_version, &pic_data, "")
}
