//! Purpose: Hold top-level CLI command dispatch for `catalog`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each mutating command forwards its notice to stderr before reporting errors.
//! Invariants: Helpers in `main.rs` remain the source of output formatting.

use super::*;

pub(super) fn dispatch_command(command: Command, remote: RemoteArgs) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "catalog", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::List(args) => {
            let config = resolve_config(&remote)?;
            let mut catalog = open_catalog(&config)?;
            catalog.set_filters(list_patch(&args)?);
            catalog.set_pagination(list_pagination(&args))?;

            let loaded = catalog.load_all();
            emit_notice(&loaded.notice);
            loaded.result?;
            if let Some(notice) = page_notice(catalog.page()) {
                emit_notice(&notice);
            }

            if args.json {
                emit_json(page_json(catalog.page()));
            } else {
                emit_page_table(catalog.page());
            }
            Ok(RunOutcome::ok())
        }
        Command::Get { id } => {
            let config = resolve_config(&remote)?;
            let catalog = open_catalog(&config)?;
            let record = catalog.fetch_one(id)?;
            emit_json(record_json(&record));
            Ok(RunOutcome::ok())
        }
        Command::Create { title, body, owner } => {
            let config = resolve_config(&remote)?;
            let mut catalog = open_catalog(&config)?;
            let draft = RecordDraft::new(title, body, owner);
            let created = catalog.create(&draft);
            emit_notice(&created.notice);
            let record = created.result?;
            emit_json(record_json(&record));
            Ok(RunOutcome::ok())
        }
        Command::Update {
            id,
            title,
            body,
            owner,
        } => {
            if title.is_none() && body.is_none() && owner.is_none() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("update needs at least one field to change")
                    .with_hint("Pass --title, --body, or --owner."));
            }
            let config = resolve_config(&remote)?;
            let mut catalog = open_catalog(&config)?;
            let mut record = catalog.fetch_one(id)?;
            if let Some(title) = title {
                record.title = title;
            }
            if let Some(body) = body {
                record.body = body;
            }
            if let Some(owner) = owner {
                record.owner_id = owner;
            }
            let updated = catalog.update(&record);
            emit_notice(&updated.notice);
            let record = updated.result?;
            emit_json(record_json(&record));
            Ok(RunOutcome::ok())
        }
        Command::Delete { id } => {
            let config = resolve_config(&remote)?;
            let mut catalog = open_catalog(&config)?;
            let deleted = catalog.delete(id);
            emit_notice(&deleted.notice);
            deleted.result?;
            emit_json(json!({ "deleted": id }));
            Ok(RunOutcome::ok())
        }
        Command::Browse => {
            let config = resolve_config(&remote)?;
            let mut catalog = open_catalog(&config)?;
            let mut board = NoticeBoard::new(config.notice_ttl);
            let stdin = io::stdin();
            browse::run_browse(
                &mut catalog,
                &mut board,
                stdin.lock(),
                io::stdout().lock(),
                io::stderr().lock(),
            )?;
            Ok(RunOutcome::ok())
        }
        Command::Serve(args) => {
            let bind: SocketAddr = args.bind.parse().map_err(|_| {
                Error::new(ErrorKind::Usage)
                    .with_message("invalid bind address")
                    .with_hint("Use a host:port value like 127.0.0.1:9800.")
            })?;
            let config = resolve_config(&remote)?;
            let seed = match &args.seed_file {
                Some(path) => serve::load_seed_file(path)?,
                None => serve::seed_records(args.seed)?,
            };
            let config = serve::ServeConfig {
                bind,
                resource: config.resource,
                seed,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
    }
}
