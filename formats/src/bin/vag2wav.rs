use {
    anyhow::{Context as _, Result as Anyhow, anyhow},
    camino::Utf8PathBuf as PathBuf,
    formats::Vag,
};

fn main() -> Anyhow<()> {
    let mut args = std::env::args().skip(1).collect::<Vec<_>>();
    let verbose = args.iter().any(|a| a == "-v");
    args.retain(|a| a != "-v");
    log_init(if verbose {log::LevelFilter::Debug} else {log::LevelFilter::Info});

    let path = PathBuf::from(args.first().ok_or(anyhow!("usage: vag2wav input.vag [out.wav] [-v]"))?);
    let out_path = match args.get(1) {
        Some(out) => PathBuf::from(out),
        None      => path.with_extension("wav"),
    };

    let bytes = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
    let vag = Vag::parse(&bytes).with_context(|| format!("decoding {path}"))?;
    log::info!("{path}: {} Hz, {} bytes adpcm -> {out_path}", vag.sample_rate, vag.data.len());

    let out = std::fs::File::create(&out_path).with_context(|| format!("creating {out_path}"))?;
    vag.write_wav(out).with_context(|| format!("writing {out_path}"))?;
    Ok(())
}

fn log_init(level: log::LevelFilter) {
    use simplelog::*;
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}
