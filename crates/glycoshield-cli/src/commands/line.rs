use crate::cli::LineArgs;
use crate::error::{CliError, Result};
use glycoshield::core::glycan::{self, AttachmentSpec};
use glycoshield::engine::error::EngineError;

pub fn run(args: LineArgs) -> Result<()> {
    let available = glycan::list_library(&args.library).map_err(|source| EngineError::Io {
        path: args.library.clone(),
        source,
    })?;

    if args.list {
        for name in &available {
            println!("{}", name);
        }
        return Ok(());
    }

    let (Some(chain), Some(resid), Some(glycan_name)) = (args.chain, args.resid, args.glycan) else {
        return Err(CliError::Argument(
            "--chain, --resid and --glycan are required unless --list is given".into(),
        ));
    };
    if !available.iter().any(|name| *name == glycan_name) {
        return Err(CliError::Argument(format!(
            "Glycan '{}' is not in the library at {}",
            glycan_name,
            args.library.display()
        )));
    }

    let spec =
        AttachmentSpec::for_library_glycan(chain, resid, &args.library, &glycan_name, &args.output_dir);
    println!("{}", spec);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(library: PathBuf, glycan: &str) -> LineArgs {
        LineArgs {
            library,
            chain: Some('A'),
            resid: Some(42),
            glycan: Some(glycan.to_string()),
            output_dir: PathBuf::from("out"),
            list: false,
        }
    }

    #[test]
    fn unknown_glycan_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Man5")).unwrap();
        let result = run(args(dir.path().to_path_buf(), "Man9"));
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn known_glycan_prints_a_line() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Man5")).unwrap();
        assert!(run(args(dir.path().to_path_buf(), "Man5")).is_ok());
    }

    #[test]
    fn missing_library_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(args(dir.path().join("missing"), "Man5"));
        assert!(matches!(result, Err(CliError::Engine(EngineError::Io { .. }))));
    }
}
