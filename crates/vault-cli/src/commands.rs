use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use vault_fs::{open_file_system, DirectoryExport, FileSystem};
use vault_gate::{AssetGate, Progress};

use crate::cli::*;
use crate::config::VaultConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = VaultConfig::load(cli.config.as_deref())?.with_root(cli.root);
    let exports = Arc::new(DirectoryExport::new(cli.export_dir));
    let fs = open_file_system(&config.store, config.fs.clone(), exports).await;
    if fs.is_degraded() {
        eprintln!(
            "{} storage unavailable at {}; changes will not be kept",
            "!".yellow().bold(),
            config.store.root.display()
        );
    }

    match cli.command {
        Command::Ensure => cmd_ensure(fs.as_ref(), &config).await,
        Command::Put(args) => cmd_put(fs.as_ref(), args).await,
        Command::Cat(args) => cmd_cat(fs.as_ref(), args).await,
        Command::Rm(args) => {
            fs.delete(&args.name).await?;
            println!("{} Deleted {}", "✓".green(), args.name.bold());
            Ok(())
        }
        Command::Ls => cmd_ls(fs.as_ref()),
        Command::Clear => {
            fs.clear().await?;
            println!("{} Cleared all stored files.", "✓".green());
            Ok(())
        }
        Command::Export(args) => {
            fs.download(&args.name).await;
            Ok(())
        }
        Command::ExportSaves => {
            fs.download_saves().await;
            Ok(())
        }
        Command::Url(args) => cmd_url(fs.as_ref(), args).await,
    }
}

async fn cmd_ensure(fs: &dyn FileSystem, config: &VaultConfig) -> anyhow::Result<()> {
    let mut gate = AssetGate::from_config(&config.gate)?;
    let progress = |p: Progress| {
        let percent = if p.total == 0 { 100 } else { p.loaded * 100 / p.total };
        eprint!("\r{} {:>3}% ({} / {} bytes)", p.text, percent, p.loaded, p.total);
    };

    match gate.ensure(fs, &progress).await {
        Ok(asset) => {
            eprintln!();
            println!(
                "{} {} ready ({} bytes)",
                "✓".green().bold(),
                gate.name().bold(),
                asset.len()
            );
            Ok(())
        }
        Err(e) if e.is_integrity_failure() => {
            eprintln!();
            println!("{} {}", "✗".red().bold(), e.to_string().red());
            Err(e.into())
        }
        Err(e) => {
            eprintln!();
            Err(e).context(format!("could not acquire {}", gate.name()))
        }
    }
}

async fn cmd_put(fs: &dyn FileSystem, args: PutArgs) -> anyhow::Result<()> {
    match &args.name {
        Some(name) => {
            let mut file = tokio::fs::File::open(&args.path)
                .await
                .with_context(|| format!("opening {}", args.path.display()))?;
            fs.upload(name, &mut file).await?;
        }
        None => fs.upload_path(&args.path).await?,
    }
    println!("{} Stored {}", "✓".green(), args.path.display().to_string().bold());
    Ok(())
}

async fn cmd_cat(fs: &dyn FileSystem, args: CatArgs) -> anyhow::Result<()> {
    let data = fs
        .read(&args.name)
        .await?
        .with_context(|| format!("{} does not exist", args.name))?;
    match args.out {
        Some(out) => {
            tokio::fs::write(&out, &data)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            println!("{} Wrote {} bytes to {}", "✓".green(), data.len(), out.display());
        }
        None => std::io::stdout().lock().write_all(&data)?,
    }
    Ok(())
}

fn cmd_ls(fs: &dyn FileSystem) -> anyhow::Result<()> {
    let names = fs.names();
    if names.is_empty() {
        println!("No stored files.");
        return Ok(());
    }
    for name in names {
        let len = fs.get(&name).map(|data| data.len()).unwrap_or_default();
        println!("{:>12}  {}", len, name);
    }
    Ok(())
}

async fn cmd_url(fs: &dyn FileSystem, args: NameArgs) -> anyhow::Result<()> {
    let object = fs
        .file_url(&args.name)
        .await
        .with_context(|| format!("{} is not stored", args.name))?;
    println!("{}", object.url().as_str().cyan());
    eprintln!("URL stays valid until Ctrl-C.");
    tokio::signal::ctrl_c().await?;
    Ok(())
}
