//! Board commands: `quickboard board`, `column …`, `card …`.
//!
//! Each mutating command opens a session (which loads the board), applies
//! one change, flushes the sync agent and reports how the save went.

use anyhow::{Context, Result, bail};
use console::style;
use quickboard::client::{BoardSession, CredentialFile, SaveStatus};
use quickboard::config::QuickboardConfig;
use quickboard::errors::SyncError;
use quickboard_common::{BoardStore, ColumnId, Item, ItemId, Status, Tag};

use super::http_client;
use crate::{CardCommands, ColumnCommands};

async fn open_session(config: &QuickboardConfig) -> Result<BoardSession> {
    let api = http_client(config)?;
    let file = CredentialFile::new(config.client.session_file());
    match BoardSession::open(api, file, config.client.debounce()).await {
        Ok(session) => Ok(session),
        Err(SyncError::NotLoggedIn) => bail!("Not logged in. Run `quickboard login` first."),
        Err(SyncError::LoggedOut) => {
            bail!("Session expired and has been cleared. Run `quickboard login` again.")
        }
        Err(e) => Err(e).context("Failed to load board"),
    }
}

/// The loaded store. `open_session` only returns once the load succeeded.
fn loaded(session: &BoardSession) -> Result<&BoardStore> {
    session.store().context("Board is not loaded")
}

async fn finish(mut session: BoardSession, changed: bool) -> Result<()> {
    if !changed {
        println!("{}", style("Nothing changed.").dim());
    }
    let status = match session.flush().await {
        Ok(status) => status,
        Err(SyncError::LoggedOut) => {
            bail!("Session expired and has been cleared. Run `quickboard login` again.")
        }
        Err(e) => return Err(e).context("Failed to save board"),
    };
    session.close().await;
    match status {
        SaveStatus::Saved => {
            println!("{}", style("Saved.").green());
            Ok(())
        }
        SaveStatus::Error => bail!("Board changes were not saved"),
        SaveStatus::Idle | SaveStatus::Saving => Ok(()),
    }
}

pub async fn cmd_board(config: &QuickboardConfig, search: Option<&str>) -> Result<()> {
    let mut session = open_session(config).await?;
    if let Some(query) = search {
        session.set_search(query);
    }
    for line in render_board(&session)? {
        println!("{}", line);
    }
    session.close().await;
    Ok(())
}

pub async fn cmd_column(config: &QuickboardConfig, command: ColumnCommands) -> Result<()> {
    let mut session = open_session(config).await?;
    let changed = match command {
        ColumnCommands::Add { title } => match session.add_column(&title) {
            Some(id) => {
                println!("Added column '{}' ({})", title, style(id).dim());
                true
            }
            None => bail!("Column title cannot be blank"),
        },
        ColumnCommands::Rename { column, title } => {
            let id = resolve_column(loaded(&session)?, &column)?;
            if title.trim().is_empty() {
                bail!("Column title cannot be blank");
            }
            session.rename_column(&id, &title)
        }
        ColumnCommands::Delete { column, yes } => {
            let store = loaded(&session)?;
            let id = resolve_column(store, &column)?;
            let (title, count) = store
                .column(&id)
                .map(|c| (c.title.clone(), c.items.len()))
                .unwrap_or_default();
            if !yes {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete '{}' and its {} card(s)? This cannot be undone",
                        title, count
                    ))
                    .default(false)
                    .interact()
                    .unwrap_or(false);
                if !confirm {
                    println!("Delete cancelled");
                    session.close().await;
                    return Ok(());
                }
            }
            session.delete_column(&id)
        }
        ColumnCommands::Move { from, to } => {
            let len = loaded(&session)?.board().column_order.len();
            if from >= len || to >= len {
                bail!("Column positions must be below {}", len);
            }
            session.reorder_columns(from, to)
        }
    };
    finish(session, changed).await
}

pub async fn cmd_card(config: &QuickboardConfig, command: CardCommands) -> Result<()> {
    let mut session = open_session(config).await?;
    let changed = match command {
        CardCommands::Add { column, title } => {
            let id = resolve_column(loaded(&session)?, &column)?;
            match session.add_item(&id, &title) {
                Some(card) => {
                    println!("Added card '{}' ({})", title, style(short_id(&card)).dim());
                    true
                }
                None => bail!("Card title cannot be blank"),
            }
        }
        CardCommands::Move {
            card,
            column,
            index,
        } => {
            let store = loaded(&session)?;
            let card = resolve_card(store, &card)?;
            let dest = resolve_column(store, &column)?;
            let (source, source_index) = locate(store, &card)?;
            let dest_len = store.column(&dest).map(|c| c.items.len()).unwrap_or(0);
            session.move_item(&source, source_index, &dest, index.unwrap_or(dest_len))
        }
        CardCommands::Edit {
            card,
            title,
            content,
            tag,
            status,
        } => {
            let store = loaded(&session)?;
            let id = resolve_card(store, &card)?;
            let edited = apply_edits(
                store,
                &id,
                title.as_deref(),
                content.as_deref(),
                tag.as_deref(),
                status.as_deref(),
            )?;
            session.update_item(edited)
        }
        CardCommands::Toggle { card } => {
            let id = resolve_card(loaded(&session)?, &card)?;
            session.toggle_item_status(&id)
        }
        CardCommands::Delete { card } => {
            let id = resolve_card(loaded(&session)?, &card)?;
            session.delete_item(&id)
        }
    };
    finish(session, changed).await
}

// ── Argument resolution ───────────────────────────────────────────────

/// A column by exact id, else by case-insensitive title.
pub fn resolve_column(store: &BoardStore, key: &str) -> Result<ColumnId> {
    let by_id = ColumnId::from(key);
    if store.column(&by_id).is_some() {
        return Ok(by_id);
    }
    let matches: Vec<&ColumnId> = store
        .ordered_columns()
        .filter(|c| c.title.eq_ignore_ascii_case(key.trim()))
        .map(|c| &c.id)
        .collect();
    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => bail!("No column named '{}'", key),
        _ => bail!("Several columns are titled '{}'; use the column id", key),
    }
}

/// A card by exact id, else by unique id prefix.
pub fn resolve_card(store: &BoardStore, key: &str) -> Result<ItemId> {
    let by_id = ItemId::from(key);
    if store.find_item(&by_id).is_some() {
        return Ok(by_id);
    }
    if key.is_empty() {
        bail!("Card id cannot be empty");
    }
    let matches: Vec<&ItemId> = store
        .ordered_columns()
        .flat_map(|c| c.items.iter())
        .filter(|item| item.id.as_str().starts_with(key))
        .map(|item| &item.id)
        .collect();
    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => bail!("No card with id '{}'", key),
        _ => bail!("Card id prefix '{}' is ambiguous", key),
    }
}

fn locate(store: &BoardStore, card: &ItemId) -> Result<(ColumnId, usize)> {
    let (column, _) = store.find_item(card).context("Card not found")?;
    let index = store
        .column(column)
        .and_then(|c| c.items.iter().position(|item| &item.id == card))
        .context("Card not found")?;
    Ok((column.clone(), index))
}

fn apply_edits(
    store: &BoardStore,
    id: &ItemId,
    title: Option<&str>,
    content: Option<&str>,
    tag: Option<&str>,
    status: Option<&str>,
) -> Result<Item> {
    let (_, item) = store.find_item(id).context("Card not found")?;
    let mut edited = item.clone();
    if let Some(title) = title {
        if title.trim().is_empty() {
            bail!("Card title cannot be blank");
        }
        edited.title = title.to_string();
    }
    if let Some(content) = content {
        edited.content = content.to_string();
    }
    if let Some(tag) = tag {
        edited.tag = tag.parse::<Tag>().map_err(anyhow::Error::msg)?;
    }
    if let Some(status) = status {
        edited.status = status.parse::<Status>().map_err(anyhow::Error::msg)?;
    }
    Ok(edited)
}

// ── Rendering ─────────────────────────────────────────────────────────

fn short_id(id: &ItemId) -> &str {
    let s = id.as_str();
    s.get(..8).unwrap_or(s)
}

fn status_marker(status: Status) -> console::StyledObject<&'static str> {
    match status {
        Status::Pending => style("[ ]"),
        Status::InProgress => style("[~]").yellow(),
        Status::Completed => style("[x]").green(),
    }
}

fn tag_style(tag: Tag) -> console::StyledObject<&'static str> {
    let s = style(tag.as_str());
    match tag {
        Tag::Meeting => s.blue(),
        Tag::Urgent => s.red(),
        Tag::Idea => s.magenta(),
        Tag::General => s.dim(),
    }
}

/// Lines of the board listing, honouring the session's search filter.
pub fn render_board(session: &BoardSession) -> Result<Vec<String>> {
    let store = loaded(session)?;
    let mut lines = Vec::new();
    lines.push(format!(
        "{}  {}",
        style(format!("{}'s board", session.username())).bold(),
        style(format!("{} cards", store.item_count())).dim()
    ));
    if session.is_filtering() {
        lines.push(format!(
            "{}",
            style(format!("filter: \"{}\" (reordering disabled)", session.search())).yellow()
        ));
    }

    for (position, column) in store.ordered_columns().enumerate() {
        let visible = session.visible_items(&column.id);
        lines.push(String::new());
        lines.push(format!(
            "{} {} {}",
            style(format!("{}.", position)).dim(),
            style(&column.title).bold().cyan(),
            style(format!("({}) {}", column.items.len(), column.id)).dim()
        ));
        if visible.is_empty() {
            lines.push(format!("   {}", style("no cards").dim()));
        }
        for item in visible {
            let title = if item.status == Status::Completed {
                style(item.title.as_str()).strikethrough()
            } else {
                style(item.title.as_str())
            };
            lines.push(format!(
                "   {} {} {} {} {}",
                status_marker(item.status),
                title,
                tag_style(item.tag),
                style(short_id(&item.id)).dim(),
                style(&item.created_at).dim()
            ));
            if let Some(first) = item.content.lines().find(|l| !l.trim().is_empty()) {
                lines.push(format!("       {}", style(first).dim()));
            }
        }
    }
    Ok(lines)
}
