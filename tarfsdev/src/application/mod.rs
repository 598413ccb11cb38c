pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use handlers::Opener;
use tarfs_core::error::Result;

pub fn run(cli: Cli) -> Result<()> {
    let open = Opener::new(cli.backend.into(), cli.policy.as_deref())?;
    match cli.command {
        Commands::List {
            archive,
            prefix,
            long,
        } => handlers::handle_list(&open, archive, prefix, long),
        Commands::Ls {
            archive,
            path,
            page,
            long,
        } => handlers::handle_ls(&open, archive, path, page, long),
        Commands::Stat {
            archive,
            path,
            json,
        } => handlers::handle_stat(&open, archive, path, json),
        Commands::Cat {
            archive,
            path,
            start,
            len,
            from_end,
        } => handlers::handle_cat(&open, archive, path, start, len, from_end),
        Commands::Get {
            archive,
            path,
            out,
            start,
            len,
        } => handlers::handle_get(&open, archive, path, out, start, len),
        Commands::Sum {
            archive,
            path,
            json,
        } => handlers::handle_sum(&open, archive, path, json),
        Commands::Info { archive, json } => handlers::handle_info(&open, archive, json),
    }
}
