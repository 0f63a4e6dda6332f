use database::{accounts, replays, PlayerAccountRecord, PlayerRecord};
use sqlx::SqliteConnection;
use types::PlayerSetup;

use crate::error::IngestError;

/// Works out which account a player entry belongs to, creating a placeholder
/// account for entries without an accountid. A lobby id always wins over
/// the accountid.
pub async fn resolve_account(
    conn: &mut SqliteConnection,
    setup: &PlayerSetup,
) -> Result<PlayerAccountRecord, IngestError> {
    let accountid = match (setup.lobbyid, setup.accountid) {
        (Some(lobbyid), _) => lobbyid,
        (None, Some(accountid)) => accountid,
        (None, None) => accounts::allocate_placeholder_id(conn).await?,
    };
    let countrycode = setup.countrycode.as_deref().unwrap_or_default();

    let (account, created) =
        accounts::get_or_create_account(conn, accountid, countrycode, &setup.name).await?;
    tracing::debug!(
        "PlayerAccount: created={} id={} accountid={} names={}",
        created,
        account.id,
        account.accountid,
        account.names
    );

    let account = if created {
        account
    } else {
        accounts::add_alias(conn, account, &setup.name).await?
    };
    if account.is_placeholder() {
        accounts::index_placeholder_name(conn, account.id, &setup.name).await?;
    }
    Ok(account)
}

/// Creates the player of `replay_id` described by `setup`, bound to its
/// resolved account. When the account is a confirmed one, earlier players
/// with the same name that only had a placeholder account are moved over to
/// it.
///
/// Matching is by display name only, so two people using the same name end
/// up on one account.
#[tracing::instrument(skip(conn, setup), fields(name = %setup.name))]
pub async fn register_player(
    conn: &mut SqliteConnection,
    replay_id: i64,
    setup: &PlayerSetup,
) -> Result<PlayerRecord, IngestError> {
    let account = resolve_account(conn, setup).await?;
    let player = replays::insert_player(
        conn,
        replay_id,
        account.id,
        &setup.name,
        setup.rank,
        setup.spectator,
    )
    .await?;

    if !account.is_placeholder() {
        merge_placeholders(conn, &account, &setup.name).await?;
    }
    Ok(player)
}

async fn merge_placeholders(
    conn: &mut SqliteConnection,
    account: &PlayerAccountRecord,
    name: &str,
) -> Result<(), IngestError> {
    let placeholders = accounts::placeholder_accounts_named(conn, name).await?;
    if placeholders.is_empty() {
        return Ok(());
    }
    tracing::info!(
        "Found accountless players named {} on accounts {:?}, moving them to accountid {}",
        name,
        placeholders,
        account.accountid
    );

    for placeholder in placeholders {
        let moved = accounts::reassign_players(conn, placeholder, account.id, name).await?;
        if accounts::delete_account_if_unused(conn, placeholder).await? {
            tracing::debug!("Moved {} players, deleted account {}", moved, placeholder);
        } else {
            // still used under another name
            accounts::unindex_placeholder_name(conn, placeholder, name).await?;
        }
    }
    Ok(())
}
