mod cli;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use cli::Cli;
use indexed_fs::{FsError, IndexedFileSystem};
use indexed_fs_fuse::BlockFile;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    println!("source={:?}\nout={:?}", cli.source, cli.out);

    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&cli.out)?;
    fd.set_len(cli.size_mib * 1024 * 1024)?;

    let block_file: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(fd));
    let efs = IndexedFileSystem::format(block_file).map_err(fs_error)?;

    let mut files = Vec::new();
    for entry in fs::read_dir(&cli.source)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    for path in files {
        let mut host_file = File::open(&path)?;
        let mut data: Vec<u8> = Vec::new();
        host_file.read_to_end(&mut data)?;

        let sector = efs.create_inode(0, false).map_err(fs_error)?;
        let inode = efs.inodes().open(sector).map_err(fs_error)?;
        let written = inode.write_at(0, &data);
        efs.inodes().close(inode);
        let written = written.map_err(fs_error)?;

        log::info!("file={path:?} sector={sector:?} length={written}");
        println!(
            "{} -> {}",
            path.file_name().unwrap_or_default().to_string_lossy(),
            sector.raw()
        );
    }

    println!("free sectors: {}", efs.free_sectors());
    efs.unmount();

    Ok(())
}

fn fs_error(e: FsError) -> io::Error {
    io::Error::other(format!("{e:?}"))
}
