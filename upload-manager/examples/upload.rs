use anyhow::Result;
use apivideo_upload_manager::{
    Environment, UploadManager, UploadProgress, UploadTarget, UploaderConfig, DEFAULT_CHUNK_SIZE,
};
use std::{
    fs::File,
    io::{stdin, Read},
    path::PathBuf,
    str::FromStr,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "upload")]
struct Opt {
    /// api.video API Key
    #[structopt(short, long)]
    api_key: Option<String>,
    /// Upload token, used when no video id is given
    #[structopt(short, long)]
    token: Option<String>,
    /// Existing video id
    #[structopt(short, long)]
    video_id: Option<String>,
    /// Use the sandbox environment
    #[structopt(long)]
    sandbox: bool,
    /// Chunk size in bytes
    #[structopt(short, long)]
    chunk_size: Option<u64>,
    /// Upload File, read from stdin in progressive mode when absent
    #[structopt(short, long, parse(from_os_str))]
    local_file: Option<PathBuf>,
    /// Upload method
    #[structopt(short, long)]
    upload_method: Option<UploadMethod>,
}

#[derive(Clone, Copy, Debug)]
enum UploadMethod {
    File,
    Progressive,
}

impl FromStr for UploadMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" | "default" => Ok(Self::File),
            "progressive" => Ok(Self::Progressive),
            s => Err(s.to_owned()),
        }
    }
}

fn print_progress(progress: UploadProgress) {
    println!(
        "Progress: {} / {} = {}%",
        progress.completed_bytes(),
        progress.total_bytes(),
        progress.completed_bytes() * 100 / progress.total_bytes().max(1)
    );
}

/// 读满缓冲区，返回实际读取的字节数
fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[async_std::main]
async fn main() -> Result<()> {
    env_logger::init();
    let opt: Opt = Opt::from_args();

    let config = {
        let mut builder = UploaderConfig::builder();
        builder.application_name("upload-example", "1.0.0")?;
        if let Some(api_key) = opt.api_key {
            builder.api_key(api_key);
        }
        if opt.sandbox {
            builder.environment(Environment::Sandbox);
        }
        if let Some(chunk_size) = opt.chunk_size {
            builder.chunk_size(chunk_size)?;
        }
        builder.build()
    };
    let upload_manager = UploadManager::builder(apivideo_upload_manager::ureq::Client::default())
        .config(config)
        .build();

    let target = match (opt.token, opt.video_id) {
        (Some(token), Some(video_id)) => UploadTarget::upload_token_with_video_id(token, video_id),
        (Some(token), None) => UploadTarget::upload_token(token),
        (None, Some(video_id)) => UploadTarget::video_id(video_id),
        (None, None) => anyhow::bail!("either --token or --video-id must be given"),
    };

    let video = match (opt.upload_method, opt.local_file) {
        (None | Some(UploadMethod::File), Some(local_file)) => {
            let session = upload_manager
                .upload_session(target)
                .on_progress(print_progress)
                .start(local_file)?;
            println!("Uploading {} parts", session.part_count());
            session.await?
        }
        (None | Some(UploadMethod::File), None) => anyhow::bail!("--local-file is required to upload a file"),
        (Some(UploadMethod::Progressive), local_file) => {
            let session = upload_manager
                .progressive_session_builder(target)
                .on_progress(print_progress)
                .build()?;
            let mut reader: Box<dyn Read> = match local_file {
                Some(local_file) => Box::new(File::open(local_file)?),
                None => Box::new(stdin()),
            };
            let chunk_size = opt.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE) as usize;
            let mut current = vec![0u8; chunk_size];
            let mut current_len = read_chunk(&mut reader, &mut current)?;
            loop {
                let mut next = vec![0u8; chunk_size];
                let next_len = read_chunk(&mut reader, &mut next)?;
                current.truncate(current_len);
                if next_len == 0 {
                    let handle = session.upload_last_part(current)?;
                    println!("Submitted Last Part: {}", handle.index());
                    break;
                }
                let handle = session.upload_part(current)?;
                println!("Submitted Part: {}", handle.index());
                current = next;
                current_len = next_len;
            }
            session.await?
        }
    };
    println!("{:?}", video);
    Ok(())
}
