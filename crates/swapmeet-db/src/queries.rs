use crate::Database;
use crate::models::{
    ChatRoomRow, ItemRow, MessageRow, NewProduct, ProductPatch, ProductRow, UserPatch, UserRow,
};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        firebase_uid: Option<&str>,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, firebase_uid, username, email, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, firebase_uid, username, email, first_name, last_name],
            )?;
            query_user(conn, "id", id)?
                .ok_or_else(|| anyhow::anyhow!("user vanished after insert: {}", id))
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_firebase_uid(&self, uid: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "firebase_uid", uid))
    }

    /// Partial update; absent fields keep their current value.
    pub fn update_user(&self, id: &str, patch: &UserPatch) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET
                     username      = COALESCE(?2, username),
                     email         = COALESCE(?3, email),
                     first_name    = COALESCE(?4, first_name),
                     last_name     = COALESCE(?5, last_name),
                     profile_image = COALESCE(?6, profile_image),
                     phone_number  = COALESCE(?7, phone_number),
                     location      = COALESCE(?8, location),
                     updated_at    = datetime('now')
                 WHERE id = ?1",
                params![
                    id,
                    patch.username,
                    patch.email,
                    patch.first_name,
                    patch.last_name,
                    patch.profile_image,
                    patch.phone_number,
                    patch.location,
                ],
            )?;
            query_user(conn, "id", id)
        })
    }

    // -- Legacy items --

    pub fn insert_item(
        &self,
        id: &str,
        title: &str,
        location: &str,
        image: &str,
        wanted_items: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO items (id, title, location, image, wanted_items)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, title, location, image, wanted_items],
            )?;
            Ok(())
        })
    }

    pub fn list_items(&self) -> Result<Vec<ItemRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, location, image, wanted_items, created_at
                 FROM items
                 ORDER BY datetime(created_at) DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ItemRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        location: row.get(2)?,
                        image: row.get(3)?,
                        wanted_items: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Products --

    pub fn insert_product(&self, id: &str, owner_id: &str, p: &NewProduct) -> Result<ProductRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO products
                     (id, owner_id, title, description, category, image,
                      wanted_items, location, status, can_sell)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    owner_id,
                    p.title,
                    p.description,
                    p.category,
                    p.image,
                    p.wanted_items,
                    p.location,
                    p.status,
                    p.can_sell,
                ],
            )?;
            query_product(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("product vanished after insert: {}", id))
        })
    }

    pub fn get_product(&self, id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| query_product(conn, id))
    }

    /// Owner-scoped lookup: someone else's product reads as absent.
    pub fn get_product_owned(&self, id: &str, owner_id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {PRODUCT_COLS} FROM products WHERE id = ?1 AND owner_id = ?2"),
                    params![id, owner_id],
                    product_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_products_by_owner(&self, owner_id: &str) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRODUCT_COLS} FROM products
                 WHERE owner_id = ?1
                 ORDER BY datetime(created_at) DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([owner_id], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marketplace feed: available products from everyone but the requester.
    pub fn list_available_products(&self, excluding_owner: &str) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRODUCT_COLS} FROM products
                 WHERE status = 'available' AND owner_id != ?1
                 ORDER BY datetime(created_at) DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([excluding_owner], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_product(
        &self,
        id: &str,
        owner_id: &str,
        patch: &ProductPatch,
    ) -> Result<Option<ProductRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE products SET
                     title        = COALESCE(?3, title),
                     description  = COALESCE(?4, description),
                     category     = COALESCE(?5, category),
                     image        = COALESCE(?6, image),
                     wanted_items = COALESCE(?7, wanted_items),
                     location     = COALESCE(?8, location),
                     status       = COALESCE(?9, status),
                     can_sell     = COALESCE(?10, can_sell),
                     updated_at   = datetime('now')
                 WHERE id = ?1 AND owner_id = ?2",
                params![
                    id,
                    owner_id,
                    patch.title,
                    patch.description,
                    patch.category,
                    patch.image,
                    patch.wanted_items,
                    patch.location,
                    patch.status,
                    patch.can_sell,
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_product(conn, id)
        })
    }

    /// Returns false when the product does not exist or belongs to someone else.
    pub fn delete_product(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM products WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Likes --

    /// Toggle a like inside one transaction, keeping the denormalized
    /// likes_count in step with the like rows. Returns None for an unknown
    /// product, otherwise (liked, likes_count) after the toggle.
    pub fn toggle_like(
        &self,
        id: &str,
        user_id: &str,
        product_id: &str,
    ) -> Result<Option<(bool, i64)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let exists: Option<i64> = tx
                .query_row("SELECT 1 FROM products WHERE id = ?1", [product_id], |r| {
                    r.get(0)
                })
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            // UNIQUE(user_id, product_id) makes the insert the arbiter:
            // zero changes means the like already existed.
            tx.execute(
                "INSERT OR IGNORE INTO product_likes (id, user_id, product_id)
                 VALUES (?1, ?2, ?3)",
                params![id, user_id, product_id],
            )?;
            let liked = tx.changes() == 1;

            if liked {
                tx.execute(
                    "UPDATE products SET likes_count = likes_count + 1 WHERE id = ?1",
                    [product_id],
                )?;
            } else {
                tx.execute(
                    "DELETE FROM product_likes WHERE user_id = ?1 AND product_id = ?2",
                    params![user_id, product_id],
                )?;
                tx.execute(
                    "UPDATE products SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?1",
                    [product_id],
                )?;
            }

            let count: i64 =
                tx.query_row("SELECT likes_count FROM products WHERE id = ?1", [product_id], |r| {
                    r.get(0)
                })?;

            tx.commit()?;
            Ok(Some((liked, count)))
        })
    }

    pub fn is_liked(&self, user_id: &str, product_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let row: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM product_likes WHERE user_id = ?1 AND product_id = ?2",
                    params![user_id, product_id],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(row.is_some())
        })
    }

    // -- Chat rooms --

    /// Find-or-create keyed on UNIQUE(product_id, starter_id). The insert
    /// either wins or is a no-op; the re-select returns whichever room
    /// holds the slot. Both users end up attached as participants.
    pub fn find_or_create_room(
        &self,
        id: &str,
        product_id: &str,
        starter_id: &str,
        owner_id: &str,
    ) -> Result<(String, bool)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT OR IGNORE INTO chat_rooms (id, product_id, starter_id)
                 VALUES (?1, ?2, ?3)",
                params![id, product_id, starter_id],
            )?;
            let created = tx.changes() == 1;

            let room_id: String = tx.query_row(
                "SELECT id FROM chat_rooms WHERE product_id = ?1 AND starter_id = ?2",
                params![product_id, starter_id],
                |r| r.get(0),
            )?;

            tx.execute(
                "INSERT OR IGNORE INTO chat_participants (room_id, user_id) VALUES (?1, ?2)",
                params![room_id, starter_id],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO chat_participants (room_id, user_id) VALUES (?1, ?2)",
                params![room_id, owner_id],
            )?;

            tx.commit()?;
            Ok((room_id, created))
        })
    }

    /// Room lookup scoped to a participant; outsiders see nothing.
    pub fn get_room_for_user(&self, room_id: &str, user_id: &str) -> Result<Option<ChatRoomRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT r.id, r.product_id, r.created_at, r.updated_at
                     FROM chat_rooms r
                     JOIN chat_participants p ON p.room_id = r.id
                     WHERE r.id = ?1 AND p.user_id = ?2",
                    params![room_id, user_id],
                    room_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_rooms_for_user(&self, user_id: &str) -> Result<Vec<ChatRoomRow>> {
        self.with_conn(|conn| {
            // updated_at compares lexicographically; activity bumps carry a
            // fractional second, so a bumped room sorts above rooms that
            // share its wall-clock second. datetime() would strip that.
            let mut stmt = conn.prepare(
                "SELECT r.id, r.product_id, r.created_at, r.updated_at
                 FROM chat_rooms r
                 JOIN chat_participants p ON p.room_id = r.id
                 WHERE p.user_id = ?1
                 ORDER BY r.updated_at DESC, r.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], room_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn room_participants(&self, room_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS_QUALIFIED} FROM users u
                 JOIN chat_participants p ON p.user_id = u.id
                 WHERE p.room_id = ?1
                 ORDER BY u.rowid"
            ))?;
            let rows = stmt
                .query_map([room_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        room_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, chat_room_id, sender_id, content)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, room_id, sender_id, content],
            )?;
            // Activity bump so the room floats up in my-chats; sub-second
            // precision so same-second bumps still reorder
            tx.execute(
                "UPDATE chat_rooms SET updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE id = ?1",
                [room_id],
            )?;
            let row = tx.query_row(
                "SELECT id, chat_room_id, sender_id, content, is_read, created_at
                 FROM messages WHERE id = ?1",
                [id],
                message_from_row,
            )?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Messages for a room in creation order, oldest first.
    pub fn list_messages(&self, room_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_room_id, sender_id, content, is_read, created_at
                 FROM messages
                 WHERE chat_room_id = ?1
                 ORDER BY datetime(created_at) ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([room_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn last_message(&self, room_id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, chat_room_id, sender_id, content, is_read, created_at
                     FROM messages
                     WHERE chat_room_id = ?1
                     ORDER BY datetime(created_at) DESC, rowid DESC
                     LIMIT 1",
                    [room_id],
                    message_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Unread messages in the room that the given user did not send.
    pub fn unread_count(&self, room_id: &str, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE chat_room_id = ?1 AND is_read = 0 AND sender_id != ?2",
                params![room_id, user_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    /// One-way flip: marks everything in the room not sent by `user_id` as
    /// read. Idempotent. Returns the number of rows flipped.
    pub fn mark_messages_read(&self, room_id: &str, user_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE chat_room_id = ?1 AND sender_id != ?2 AND is_read = 0",
                params![room_id, user_id],
            )?;
            Ok(changed)
        })
    }
}

const USER_COLS: &str = "id, firebase_uid, username, email, first_name, last_name, \
                         profile_image, phone_number, location, created_at, updated_at";

const USER_COLS_QUALIFIED: &str =
    "u.id, u.firebase_uid, u.username, u.email, u.first_name, u.last_name, \
     u.profile_image, u.phone_number, u.location, u.created_at, u.updated_at";

const PRODUCT_COLS: &str = "id, owner_id, title, description, category, image, wanted_items, \
                            location, status, can_sell, likes_count, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        firebase_uid: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        profile_image: row.get(6)?,
        phone_number: row.get(7)?,
        location: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        image: row.get(5)?,
        wanted_items: row.get(6)?,
        location: row.get(7)?,
        status: row.get(8)?,
        can_sell: row.get(9)?,
        likes_count: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<ChatRoomRow> {
    Ok(ChatRoomRow {
        id: row.get(0)?,
        product_id: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        chat_room_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_user(conn: &Connection, col: &str, value: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE {col} = ?1"),
            [value],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_product(conn: &Connection, id: &str) -> Result<Option<ProductRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"),
            [id],
            product_from_row,
        )
        .optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
