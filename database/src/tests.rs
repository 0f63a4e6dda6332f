#[cfg(test)]
mod database_tests {
    use crate::*;
    use chrono::NaiveDate;
    use sqlx::SqliteConnection;

    pub async fn setup_test_db() -> ReplayDatabase {
        ReplayDatabase::connect(&DatabaseConfig::in_memory())
            .await
            .expect("Failed to create test database")
    }

    fn new_replay(game_id: &str) -> NewReplay {
        NewReplay {
            game_id: game_id.to_string(),
            version_string: "85.0".to_string(),
            unix_time: NaiveDate::from_ymd_opt(2012, 3, 4)
                .unwrap()
                .and_hms_opt(20, 15, 0)
                .unwrap(),
            wallclock_time: 1200,
            mapname: Some("Delta Siege Dry".to_string()),
            autohostname: None,
            gametype: Some("Balanced Annihilation V7.63".to_string()),
            startpostype: Some(2),
            not_complete: false,
            uploader: "dansan".to_string(),
        }
    }

    async fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(conn)
            .await
            .expect("Failed to count rows")
    }

    #[tokio::test]
    async fn test_tags_are_case_insensitive() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let upper = tags::get_or_create_tag(&mut conn, "FFA").await.unwrap();
        let lower = tags::get_or_create_tag(&mut conn, "ffa").await.unwrap();

        assert_eq!(upper, lower);
        assert_eq!(lower.name, "FFA");
        assert_eq!(count(&mut conn, "tags").await, 1);
    }

    /// Umlauts and Cyrillic letters fold like ASCII ones
    #[tokio::test]
    async fn test_tags_fold_non_ascii_case() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let aerger = tags::get_or_create_tag(&mut conn, "Ärger").await.unwrap();
        let aerger_lower = tags::get_or_create_tag(&mut conn, "ärger").await.unwrap();
        let turnir = tags::get_or_create_tag(&mut conn, "ТУРНИР").await.unwrap();
        let turnir_lower = tags::get_or_create_tag(&mut conn, "турнир").await.unwrap();

        assert_eq!(aerger, aerger_lower);
        assert_eq!(turnir, turnir_lower);
        assert_ne!(aerger.id, turnir.id);
        assert_eq!(aerger_lower.name, "Ärger");
        assert_eq!(turnir_lower.name, "ТУРНИР");
        assert_eq!(count(&mut conn, "tags").await, 2);

        let replay_id = replays::insert_replay(&mut conn, &new_replay("g1"))
            .await
            .unwrap()
            .expect("replay should be new");
        tags::attach_tag(&mut conn, replay_id, turnir.id).await.unwrap();

        let tagged = browse::replays_tagged(&mut conn, "Турнир").await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, replay_id);
    }

    #[tokio::test]
    async fn test_attach_tag_is_idempotent() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let replay_id = replays::insert_replay(&mut conn, &new_replay("g1"))
            .await
            .unwrap()
            .expect("replay should be new");
        let tag = tags::get_or_create_tag(&mut conn, "2v2").await.unwrap();
        tags::attach_tag(&mut conn, replay_id, tag.id).await.unwrap();
        tags::attach_tag(&mut conn, replay_id, tag.id).await.unwrap();

        assert_eq!(tags::tags_for_replay(&mut conn, replay_id).await.unwrap(), vec![tag]);
        assert_eq!(tags::clear_replay_tags(&mut conn, replay_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_replay_reports_duplicates() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = replays::insert_replay(&mut conn, &new_replay("dup")).await.unwrap();
        let second = replays::insert_replay(&mut conn, &new_replay("dup")).await.unwrap();

        assert!(first.is_some());
        assert_eq!(second, None);
        assert_eq!(count(&mut conn, "replays").await, 1);

        let stored = replays::get_replay(&mut conn, "dup").await.unwrap();
        assert_eq!(stored.id, first.unwrap());
        assert_eq!(stored.unix_time.to_string(), "2012-03-04 20:15:00");
        assert_eq!(stored.title, "");
    }

    #[tokio::test]
    async fn test_placeholder_ids_never_repeat() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = accounts::allocate_placeholder_id(&mut conn).await.unwrap();
        let second = accounts::allocate_placeholder_id(&mut conn).await.unwrap();
        assert_eq!(first, -1);
        assert_eq!(second, -2);

        // an explicitly stored low id pushes the sequence below it
        accounts::get_or_create_account(&mut conn, -10, "", "Bot")
            .await
            .unwrap();
        let third = accounts::allocate_placeholder_id(&mut conn).await.unwrap();
        assert_eq!(third, -11);
    }

    #[tokio::test]
    async fn test_get_or_create_account() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let (created, was_created) = accounts::get_or_create_account(&mut conn, 42, "DE", "Alice")
            .await
            .unwrap();
        let (found, was_created_again) =
            accounts::get_or_create_account(&mut conn, 42, "FR", "Alicia")
                .await
                .unwrap();

        assert!(was_created);
        assert!(!was_created_again);
        assert_eq!(created, found);
        assert_eq!(found.countrycode, "DE");
        assert_eq!(found.names, "Alice");
        assert_eq!(count(&mut conn, "player_accounts").await, 1);
    }

    #[tokio::test]
    async fn test_add_alias_is_case_sensitive() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let (account, _) = accounts::get_or_create_account(&mut conn, 7, "", "Bob")
            .await
            .unwrap();
        let account = accounts::add_alias(&mut conn, account, "Bob").await.unwrap();
        assert_eq!(account.names, "Bob");

        let account = accounts::add_alias(&mut conn, account, "bob").await.unwrap();
        assert_eq!(account.names, "Bob;bob");

        let stored = accounts::find_account(&mut conn, 7).await.unwrap().unwrap();
        assert_eq!(stored.aliases().collect::<Vec<_>>(), vec!["Bob", "bob"]);
    }

    #[tokio::test]
    async fn test_unused_accounts_are_deleted() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let replay_id = replays::insert_replay(&mut conn, &new_replay("g1"))
            .await
            .unwrap()
            .unwrap();
        let (placeholder, _) = accounts::get_or_create_account(&mut conn, -1, "", "Alice")
            .await
            .unwrap();
        accounts::index_placeholder_name(&mut conn, placeholder.id, "Alice")
            .await
            .unwrap();
        let (confirmed, _) = accounts::get_or_create_account(&mut conn, 42, "", "Alice")
            .await
            .unwrap();
        replays::insert_player(&mut conn, replay_id, placeholder.id, "Alice", 0, false)
            .await
            .unwrap();

        assert_eq!(
            accounts::placeholder_accounts_named(&mut conn, "Alice").await.unwrap(),
            vec![placeholder.id]
        );
        assert!(!accounts::delete_account_if_unused(&mut conn, placeholder.id)
            .await
            .unwrap());

        let moved = accounts::reassign_players(&mut conn, placeholder.id, confirmed.id, "Alice")
            .await
            .unwrap();
        assert_eq!(moved, 1);
        assert!(accounts::delete_account_if_unused(&mut conn, placeholder.id)
            .await
            .unwrap());
        assert!(accounts::placeholder_accounts_named(&mut conn, "Alice")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(count(&mut conn, "placeholder_names").await, 0);
    }

    #[tokio::test]
    async fn test_prune_empty_allyteams() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let replay_id = replays::insert_replay(&mut conn, &new_replay("g1"))
            .await
            .unwrap()
            .unwrap();
        let (account, _) = accounts::get_or_create_account(&mut conn, 1, "", "Alice")
            .await
            .unwrap();
        let leader = replays::insert_player(&mut conn, replay_id, account.id, "Alice", 0, false)
            .await
            .unwrap();
        let used = replays::insert_allyteam(&mut conn, replay_id, 0, true, None)
            .await
            .unwrap();
        replays::insert_allyteam(&mut conn, replay_id, 1, false, Some((0.0, 0.0, 0.5, 0.5)))
            .await
            .unwrap();
        replays::insert_team(&mut conn, replay_id, 0, used, leader.id, "ff0000", None, None)
            .await
            .unwrap();

        assert_eq!(
            replays::allyteam_team_counts(&mut conn, replay_id).await.unwrap(),
            vec![1, 0]
        );
        assert_eq!(replays::prune_empty_allyteams(&mut conn, replay_id).await.unwrap(), 1);
        assert_eq!(
            replays::allyteam_team_counts(&mut conn, replay_id).await.unwrap(),
            vec![1]
        );
    }

    #[tokio::test]
    async fn test_shared_map_images_are_unique() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let (map, created) = maps::get_or_create_map(&mut conn, "Tabula", 12, 12, "1.0,2.0")
            .await
            .unwrap();
        let (again, created_again) = maps::get_or_create_map(&mut conn, "Tabula", 99, 99, "")
            .await
            .unwrap();
        assert!(created);
        assert!(!created_again);
        assert_eq!(map, again);

        let first = maps::get_or_create_shared_map_img(&mut conn, map.id, 1, "tabula_1.jpg")
            .await
            .unwrap();
        let second = maps::get_or_create_shared_map_img(&mut conn, map.id, 1, "other.jpg")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.filename, "tabula_1.jpg");

        // start box images are per replay
        maps::insert_map_img(&mut conn, map.id, 2, "boxes_a.jpg").await.unwrap();
        maps::insert_map_img(&mut conn, map.id, 2, "boxes_b.jpg").await.unwrap();
        assert_eq!(maps::map_imgs(&mut conn, map.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_record_download() {
        let db = setup_test_db().await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            let replay_id = replays::insert_replay(&mut conn, &new_replay("g1"))
                .await
                .unwrap()
                .unwrap();
            replays::insert_replay_file(&mut conn, replay_id, "a__x.sdf", "/media", "a.sdf")
                .await
                .unwrap();
        }

        db.record_download("g1").await.unwrap();
        let file = db.record_download("g1").await.unwrap();
        assert_eq!(file.download_count, 2);
        assert_eq!(file.ori_filename, "a.sdf");

        assert!(matches!(
            db.record_download("missing").await,
            Err(DatabaseError::ReplayNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_rows() {
        let db = setup_test_db().await;

        let mut tx = db.begin().await.unwrap();
        replays::insert_replay(&mut tx, &new_replay("g1")).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(db.find_replay("g1").await.unwrap(), None);
        assert_eq!(db.replay_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replay_listings() {
        let db = setup_test_db().await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            replays::insert_replay(&mut conn, &new_replay("g1")).await.unwrap();
            let mut other = new_replay("g2");
            other.gametype = Some("XTA 9.7".to_string());
            other.uploader = "someone".to_string();
            other.unix_time = NaiveDate::from_ymd_opt(2013, 1, 2)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap();
            replays::insert_replay(&mut conn, &other).await.unwrap();
        }

        let newest = db.newest_replays(1).await.unwrap();
        assert_eq!(newest[0].game_id, "g2");
        assert_eq!(db.replays_of_gametype("XTA 9.7").await.unwrap().len(), 1);
        assert_eq!(db.replays_by_uploader("dansan").await.unwrap()[0].game_id, "g1");
        assert_eq!(db.replays_played_on("2012").await.unwrap()[0].game_id, "g1");
        assert_eq!(db.replays_played_on("2013-01-02").await.unwrap()[0].game_id, "g2");
        assert!(db.replays_played_on("2012-04").await.unwrap().is_empty());
        assert_eq!(db.replays_uploaded_on("2").await.unwrap().len(), 2);

        let gametypes = db.gametype_counts().await.unwrap();
        assert_eq!(gametypes.len(), 2);
        assert!(gametypes.iter().all(|g| g.count == 1));
    }
}
