use std::io::{Seek, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use lazy_static::lazy_static;

lazy_static! {
    static ref FILE_MUTEX: Mutex<()> = Mutex::new(());
}

pub fn open_with_create_append<P: AsRef<Path>>(path: P) -> anyhow::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .with_context(|| format!("fail to open or create {:?}", path.as_ref()))
}

pub fn append_to_file<P: AsRef<Path>>(filename: P, content: &str) -> anyhow::Result<()> {
    let _file_mutex = FILE_MUTEX.lock().unwrap();

    let mut f = open_with_create_append(filename)?;
    f.seek(std::io::SeekFrom::End(0))?;
    writeln!(f, "{}", content)?;
    Ok(())
}
