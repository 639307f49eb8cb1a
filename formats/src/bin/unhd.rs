use {
    anyhow::{Context as _, Result as Anyhow, anyhow},
    camino::Utf8PathBuf as PathBuf,
    formats::AudioBank,
};

fn main() -> Anyhow<()> {
    let mut args = std::env::args().skip(1).collect::<Vec<_>>();
    let verbose = args.iter().any(|a| a == "-v");
    args.retain(|a| a != "-v");
    log_init(if verbose {log::LevelFilter::Debug} else {log::LevelFilter::Info});

    let usage = || anyhow!("usage: unhd input.hd input.bd [out_dir] [-v]");
    let hd_path = PathBuf::from(args.first().ok_or_else(usage)?);
    let bd_path = PathBuf::from(args.get(1).ok_or_else(usage)?);
    let out_dir = match args.get(2) {
        Some(dir) => PathBuf::from(dir),
        None      => PathBuf::from(hd_path.file_stem().unwrap_or("out")),
    };

    let hd = std::fs::read(&hd_path).with_context(|| format!("reading {hd_path}"))?;
    let bd = std::fs::read(&bd_path).with_context(|| format!("reading {bd_path}"))?;

    let bank = AudioBank::decode(&hd).with_context(|| format!("decoding {hd_path}"))?;
    let version = bank.version;
    log::info!("{hd_path}: version {}.{}, {} streams",
        version.major, version.minor, bank.vag_info.items.len());
    if bank.header.bd_file_size as usize != bd.len() {
        log::warn!("{bd_path} is {} bytes, header expects {}", bd.len(), bank.header.bd_file_size);
    }

    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {out_dir}"))?;
    for (i, vag) in bank.audio_streams(&bd)?.into_iter().enumerate() {
        let out_path = out_dir.join(format!("{i:03}.wav"));
        log::info!("{out_path}: {} Hz, {} bytes adpcm", vag.sample_rate, vag.data.len());
        let out = std::fs::File::create(&out_path).with_context(|| format!("creating {out_path}"))?;
        vag.write_wav(out).with_context(|| format!("writing {out_path}"))?;
    }

    Ok(())
}

fn log_init(level: log::LevelFilter) {
    use simplelog::*;
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}
