extern crate agitools;

use agitools::restype::{ResourceID, ResourceType};
use agitools::storage::DirectorySource;
use agitools::volume::{Volume, VolumeError};
use log::{info, warn};
use std::env;
use std::fs::File;
use std::io::Write;

const RESOURCE_TYPES: [ ResourceType; 6 ] = [
    ResourceType::Logic,
    ResourceType::Picture,
    ResourceType::View,
    ResourceType::Sound,
    ResourceType::Objects,
    ResourceType::Words,
];

fn write_resource(out_path: &str, id: &ResourceID, data: &[u8]) -> Result<(), VolumeError> {
    let out_fname = format!("{}/{}", out_path, id);
    let mut r_file = File::create(&out_fname).map_err(|e| VolumeError::Storage(out_fname.clone(), e))?;
    r_file.write_all(data).map_err(|e| VolumeError::Storage(out_fname, e))
}

fn main() -> Result<(), VolumeError> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: {} game-directory output-directory", args[0]);
        std::process::exit(1);
    }
    let data_path = &args[1];
    let out_path = &args[2];
    std::fs::create_dir_all(out_path).map_err(|e| VolumeError::Storage(out_path.clone(), e))?;

    let volume = Volume::open(DirectorySource::new(data_path))?;
    print!("{}", volume.info());

    let mut extracted = 0;
    let mut failed = 0;
    for &rtype in RESOURCE_TYPES.iter() {
        for num in volume.resource_ids(rtype) {
            let id = ResourceID{ rtype, num };
            let entry = volume.entry(rtype, num)?;
            println!("{} volume {} offset {} length {}", id, entry.volume, entry.offset, entry.length);

            match volume.load(rtype, num) {
                Ok(data) => {
                    println!("  => {} bytes", data.len());
                    write_resource(out_path, &id, &data)?;
                    extracted += 1;
                },
                Err(e) => {
                    warn!("{}: {}", id, e);
                    println!("  !! could not load, skipping");
                    failed += 1;
                }
            }
        }
    }
    info!("{} resources extracted, {} failed", extracted, failed);
    Ok(())
}
