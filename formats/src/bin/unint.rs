use {
    anyhow::{Context as _, Result as Anyhow, anyhow},
    camino::{Utf8Component, Utf8Path as Path, Utf8PathBuf as PathBuf},
    formats::{IntCodec, Lzss},
};

fn main() -> Anyhow<()> {
    let mut args = std::env::args().skip(1).collect::<Vec<_>>();
    let verbose = args.iter().any(|a| a == "-v");
    args.retain(|a| a != "-v");
    log_init(if verbose {log::LevelFilter::Debug} else {log::LevelFilter::Info});

    let path = PathBuf::from(args.first().ok_or(anyhow!("usage: unint input.int [out_dir] [-v]"))?);
    let out_dir = match args.get(1) {
        Some(dir) => PathBuf::from(dir),
        None      => PathBuf::from(path.file_stem().unwrap_or("out")),
    };

    let int = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
    let container = IntCodec::new(Lzss::PTR2).decode(&int)
        .with_context(|| format!("decoding {path}"))?;

    for (resource_type, file) in container.files() {
        let dir = out_dir.join(resource_type.name());
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {dir}"))?;
        if !is_plain_name(&file.name) {
            log::warn!("skipping {resource_type} file {:?}: not a plain file name", file.name);
            continue;
        }
        let out_path = dir.join(&file.name);
        log::info!("{out_path} ({} bytes)", file.contents.len());
        std::fs::write(&out_path, &file.contents).with_context(|| format!("writing {out_path}"))?;
    }

    Ok(())
}

/// True if `name` is one normal path component, so joining it stays inside the output dir.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Utf8Component::Normal(part)), None) => part == name,
        _ => false,
    }
}

fn log_init(level: log::LevelFilter) {
    use simplelog::*;
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

#[cfg(test)]
#[test]
fn only_plain_names_are_written() {
    assert!(is_plain_name("a.bin"));
    assert!(is_plain_name("TEX_01.TM2"));
    for bad in ["", ".", "..", "../../x", "/etc/x", "a/b", "sub/", "./a"] {
        assert!(!is_plain_name(bad), "{bad:?}");
    }
}
