use std::env;
use std::fs;
use std::io;
use std::path::Path;

fn main() -> io::Result<()> {
    // Copy bundle resources to the output directory for app bundle creation
    println!("cargo:rerun-if-changed=resources/Info.plist");

    let out_dir = env::var("OUT_DIR").map_err(|err| io::Error::new(io::ErrorKind::NotFound, err))?;
    let resources_dir = Path::new("resources");

    if resources_dir.exists() {
        let target_dir = Path::new(&out_dir).join("resources");
        fs::create_dir_all(&target_dir)?;

        for entry in fs::read_dir(resources_dir)? {
            let entry = entry?;
            fs::copy(entry.path(), target_dir.join(entry.file_name()))?;
        }
    }

    // Set macOS deployment target
    println!("cargo:rustc-env=MACOSX_DEPLOYMENT_TARGET=13.0");
    Ok(())
}
