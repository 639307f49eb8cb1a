use {
    anyhow::{Context as _, Result as Anyhow, anyhow},
    camino::Utf8PathBuf as PathBuf,
};

const CD: u32 = 44_100;

fn main() -> Anyhow<()> {
    let mut args = std::env::args().skip(1).collect::<Vec<_>>();
    let verbose = args.iter().any(|a| a == "-v");
    args.retain(|a| a != "-v");
    log_init(if verbose {log::LevelFilter::Debug} else {log::LevelFilter::Info});

    let usage = || anyhow!("usage: adpcm2wav input.raw out-name [rate] [-v]");
    let in_path = PathBuf::from(args.first().ok_or_else(usage)?);
    let out_name = args.get(1).ok_or_else(usage)?;
    let rate = match args.get(2) {
        Some(rate) => rate.parse().context("bad sample rate")?,
        None       => CD / 2,
    };

    let adpcm = std::fs::read(&in_path).with_context(|| format!("reading {in_path}"))?;
    let frames = adpcm.chunks_exact(spu_adpcm::BLOCK_LEN).collect::<Vec<_>>();

    // raw dumps often hold several sounds back to back; split at each loop-end
    let mut off = 0;
    for (i, chunk) in frames.split_inclusive(|frame| frame[1] & 1 != 0).enumerate() {
        let chunk_len_bytes = chunk.len() * spu_adpcm::BLOCK_LEN;
        log::info!("chunk {i:02} at +{off:05x}; {chunk_len_bytes}B");

        let bytes = chunk.concat();
        let pcm = spu_adpcm::decode(&bytes).collect::<Vec<_>>();
        off += chunk_len_bytes;

        let out_path = format!("{out_name}-{i:02}.wav");
        let out = std::fs::File::create(&out_path)
            .with_context(|| format!("creating {out_path}"))?;
        spu_adpcm::wav::write_mono16(out, rate, &pcm)
            .with_context(|| format!("writing {out_path}"))?;
    }

    Ok(())
}

fn log_init(level: log::LevelFilter) {
    use simplelog::*;
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}
