use swapmeet_db::Database;
use swapmeet_db::models::{NewProduct, ProductPatch, UserPatch};
use uuid::Uuid;

fn db() -> Database {
    Database::open_in_memory().unwrap()
}

fn add_user(db: &Database, username: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.create_user(&id, Some(&format!("fb-{username}")), username, "", "", "")
        .unwrap();
    id
}

fn add_product(db: &Database, owner: &str, title: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.insert_product(
        &id,
        owner,
        &NewProduct {
            title: title.to_string(),
            description: "desc".to_string(),
            category: "Electronics".to_string(),
            image: String::new(),
            wanted_items: "bike, lamp".to_string(),
            location: "Oslo".to_string(),
            status: "available".to_string(),
            can_sell: false,
        },
    )
    .unwrap();
    id
}

#[test]
fn toggle_like_twice_restores_original_state() {
    let db = db();
    let owner = add_user(&db, "owner");
    let liker = add_user(&db, "liker");
    let product = add_product(&db, &owner, "camera");

    let (liked, count) = db
        .toggle_like(&Uuid::new_v4().to_string(), &liker, &product)
        .unwrap()
        .unwrap();
    assert!(liked);
    assert_eq!(count, 1);
    assert!(db.is_liked(&liker, &product).unwrap());

    let (liked, count) = db
        .toggle_like(&Uuid::new_v4().to_string(), &liker, &product)
        .unwrap()
        .unwrap();
    assert!(!liked);
    assert_eq!(count, 0);
    assert!(!db.is_liked(&liker, &product).unwrap());

    // Counter matches the actual row count after the round trip
    let stored = db.get_product(&product).unwrap().unwrap();
    assert_eq!(stored.likes_count, 0);
}

#[test]
fn toggle_like_unknown_product_is_none() {
    let db = db();
    let liker = add_user(&db, "liker");
    let missing = Uuid::new_v4().to_string();
    assert!(db.toggle_like(&Uuid::new_v4().to_string(), &liker, &missing).unwrap().is_none());
}

#[test]
fn like_counter_never_goes_negative() {
    let db = db();
    let owner = add_user(&db, "owner");
    let liker = add_user(&db, "liker");
    let product = add_product(&db, &owner, "camera");

    db.toggle_like(&Uuid::new_v4().to_string(), &liker, &product)
        .unwrap();
    // Simulate out-of-band counter corruption
    db.with_conn(|conn| {
        conn.execute("UPDATE products SET likes_count = 0 WHERE id = ?1", [product.as_str()])?;
        Ok(())
    })
    .unwrap();

    let (liked, count) = db
        .toggle_like(&Uuid::new_v4().to_string(), &liker, &product)
        .unwrap()
        .unwrap();
    assert!(!liked);
    assert_eq!(count, 0);
}

#[test]
fn find_or_create_room_is_idempotent() {
    let db = db();
    let owner = add_user(&db, "owner");
    let buyer = add_user(&db, "buyer");
    let product = add_product(&db, &owner, "camera");

    let (room_a, created_a) = db
        .find_or_create_room(&Uuid::new_v4().to_string(), &product, &buyer, &owner)
        .unwrap();
    let (room_b, created_b) = db
        .find_or_create_room(&Uuid::new_v4().to_string(), &product, &buyer, &owner)
        .unwrap();

    assert!(created_a);
    assert!(!created_b);
    assert_eq!(room_a, room_b);

    let participants = db.room_participants(&room_a).unwrap();
    assert_eq!(participants.len(), 2);

    // A different starter for the same product gets its own room
    let other = add_user(&db, "other");
    let (room_c, created_c) = db
        .find_or_create_room(&Uuid::new_v4().to_string(), &product, &other, &owner)
        .unwrap();
    assert!(created_c);
    assert_ne!(room_c, room_a);
}

#[test]
fn room_lookup_is_participant_scoped() {
    let db = db();
    let owner = add_user(&db, "owner");
    let buyer = add_user(&db, "buyer");
    let outsider = add_user(&db, "outsider");
    let product = add_product(&db, &owner, "camera");

    let (room, _) = db
        .find_or_create_room(&Uuid::new_v4().to_string(), &product, &buyer, &owner)
        .unwrap();

    assert!(db.get_room_for_user(&room, &buyer).unwrap().is_some());
    assert!(db.get_room_for_user(&room, &owner).unwrap().is_some());
    assert!(db.get_room_for_user(&room, &outsider).unwrap().is_none());
    assert_eq!(db.list_rooms_for_user(&outsider).unwrap().len(), 0);
    assert_eq!(db.list_rooms_for_user(&buyer).unwrap().len(), 1);
}

#[test]
fn messages_come_back_in_creation_order() {
    let db = db();
    let owner = add_user(&db, "owner");
    let buyer = add_user(&db, "buyer");
    let product = add_product(&db, &owner, "camera");
    let (room, _) = db
        .find_or_create_room(&Uuid::new_v4().to_string(), &product, &buyer, &owner)
        .unwrap();

    for i in 0..5 {
        let sender = if i % 2 == 0 { &buyer } else { &owner };
        db.insert_message(&Uuid::new_v4().to_string(), &room, sender, &format!("m{i}"))
            .unwrap();
    }

    let messages = db.list_messages(&room).unwrap();
    let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);

    let last = db.last_message(&room).unwrap().unwrap();
    assert_eq!(last.content, "m4");
}

#[test]
fn rooms_sort_by_most_recent_activity() {
    let db = db();
    let owner = add_user(&db, "owner");
    let buyer = add_user(&db, "buyer");
    let camera = add_product(&db, &owner, "camera");
    let bike = add_product(&db, &owner, "bike");

    let (room_a, _) = db
        .find_or_create_room(&Uuid::new_v4().to_string(), &camera, &buyer, &owner)
        .unwrap();
    let (room_b, _) = db
        .find_or_create_room(&Uuid::new_v4().to_string(), &bike, &buyer, &owner)
        .unwrap();

    // Untouched rooms: most recently created first
    let rooms = db.list_rooms_for_user(&buyer).unwrap();
    assert_eq!(rooms[0].id, room_b);
    assert_eq!(rooms[1].id, room_a);

    // A message floats the older room to the top, even when the bump lands
    // in the same wall-clock second as the other room's creation
    db.insert_message(&Uuid::new_v4().to_string(), &room_a, &buyer, "ping")
        .unwrap();
    let rooms = db.list_rooms_for_user(&buyer).unwrap();
    assert_eq!(rooms[0].id, room_a);
    assert_eq!(rooms[1].id, room_b);

    // And a later message in the other room reorders again
    db.insert_message(&Uuid::new_v4().to_string(), &room_b, &owner, "pong")
        .unwrap();
    let rooms = db.list_rooms_for_user(&buyer).unwrap();
    assert_eq!(rooms[0].id, room_b);
}

#[test]
fn mark_read_skips_own_messages() {
    let db = db();
    let owner = add_user(&db, "owner");
    let buyer = add_user(&db, "buyer");
    let product = add_product(&db, &owner, "camera");
    let (room, _) = db
        .find_or_create_room(&Uuid::new_v4().to_string(), &product, &buyer, &owner)
        .unwrap();

    db.insert_message(&Uuid::new_v4().to_string(), &room, &buyer, "from buyer")
        .unwrap();
    db.insert_message(&Uuid::new_v4().to_string(), &room, &owner, "from owner")
        .unwrap();

    assert_eq!(db.unread_count(&room, &buyer).unwrap(), 1);

    let flipped = db.mark_messages_read(&room, &buyer).unwrap();
    assert_eq!(flipped, 1);
    assert_eq!(db.unread_count(&room, &buyer).unwrap(), 0);

    // Buyer's own message is still unread from the owner's side
    assert_eq!(db.unread_count(&room, &owner).unwrap(), 1);

    // Idempotent
    assert_eq!(db.mark_messages_read(&room, &buyer).unwrap(), 0);

    let messages = db.list_messages(&room).unwrap();
    let own = messages.iter().find(|m| m.sender_id == buyer).unwrap();
    assert!(!own.is_read);
}

#[test]
fn product_listings_are_scoped() {
    let db = db();
    let alice = add_user(&db, "alice");
    let bob = add_user(&db, "bob");
    let mine = add_product(&db, &alice, "camera");
    let theirs = add_product(&db, &bob, "bike");
    let sold = add_product(&db, &bob, "lamp");
    db.update_product(
        &sold,
        &bob,
        &ProductPatch {
            status: Some("exchanged".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let my_products = db.list_products_by_owner(&alice).unwrap();
    assert_eq!(my_products.len(), 1);
    assert_eq!(my_products[0].id, mine);

    // Feed excludes own products and anything not available
    let feed = db.list_available_products(&alice).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, theirs);

    // Owner-scoped detail hides other people's products
    assert!(db.get_product_owned(&theirs, &alice).unwrap().is_none());
    assert!(db.get_product_owned(&mine, &alice).unwrap().is_some());
}

#[test]
fn product_delete_is_owner_scoped_and_cascades_likes() {
    let db = db();
    let alice = add_user(&db, "alice");
    let bob = add_user(&db, "bob");
    let product = add_product(&db, &alice, "camera");
    db.toggle_like(&Uuid::new_v4().to_string(), &bob, &product)
        .unwrap();

    assert!(!db.delete_product(&product, &bob).unwrap());
    assert!(db.delete_product(&product, &alice).unwrap());
    assert!(db.get_product(&product).unwrap().is_none());
    assert!(!db.is_liked(&bob, &product).unwrap());
}

#[test]
fn user_update_is_partial() {
    let db = db();
    let id = add_user(&db, "alice");
    let updated = db
        .update_user(
            &id,
            &UserPatch {
                location: Some("Bergen".to_string()),
                phone_number: Some("12345678".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

    assert_eq!(updated.username, "alice");
    assert_eq!(updated.location, "Bergen");
    assert_eq!(updated.phone_number, "12345678");
}

#[test]
fn firebase_uid_lookup_and_uniqueness() {
    let db = db();
    let id = add_user(&db, "alice");
    let found = db.get_user_by_firebase_uid("fb-alice").unwrap().unwrap();
    assert_eq!(found.id, id);
    assert!(db.get_user_by_firebase_uid("fb-nobody").unwrap().is_none());

    // Second user with the same external identity is rejected by the store
    let dup = db.create_user(
        &Uuid::new_v4().to_string(),
        Some("fb-alice"),
        "alice2",
        "",
        "",
        "",
    );
    assert!(dup.is_err());
}

#[test]
fn legacy_items_list_newest_first() {
    let db = db();
    let a = Uuid::new_v4().to_string();
    let b = Uuid::new_v4().to_string();
    db.insert_item(&a, "old lamp", "Oslo", "", "chair, table").unwrap();
    db.insert_item(&b, "new lamp", "Bergen", "", "").unwrap();

    let items = db.list_items().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, b);
    assert_eq!(items[1].id, a);
}
