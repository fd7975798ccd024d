use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageContent, MessageId, RoomId, Timestamp, UserId};

/// 聊天消息。创建后只有已读标记可以变化。
///
/// 房间内的顺序由 `(created_at, id)` 升序确定，时间戳精度不足时以自增 id 决胜。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Message {
    pub fn position(&self) -> (Timestamp, MessageId) {
        (self.created_at, self.id)
    }

    /// 对某个参与者而言是否未读：自己发送的消息总是视为已读。
    pub fn is_unread_for(&self, participant: UserId) -> bool {
        self.sender_id != participant && !self.is_read
    }

    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

impl NewMessage {
    pub fn new(
        room_id: RoomId,
        sender_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            room_id,
            sender_id,
            content,
            created_at,
        }
    }

    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            room_id: self.room_id,
            sender_id: self.sender_id,
            content: self.content,
            is_read: false,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(id: i64, sender: i64) -> Message {
        NewMessage::new(
            RoomId::new(1),
            UserId::new(sender),
            MessageContent::new("hi").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
        .into_message(MessageId::new(id))
    }

    #[test]
    fn own_messages_are_never_unread() {
        let mut msg = message(1, 1);
        assert!(!msg.is_unread_for(UserId::new(1)));
        assert!(msg.is_unread_for(UserId::new(2)));
        msg.mark_read();
        assert!(!msg.is_unread_for(UserId::new(2)));
    }

    #[test]
    fn equal_timestamps_are_ordered_by_id() {
        let first = message(1, 1);
        let second = message(2, 2);
        assert!(first.position() < second.position());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let value = serde_json::to_value(message(5, 2)).unwrap();
        let object = value.as_object().unwrap();
        for key in ["id", "roomId", "senderId", "content", "isRead", "createdAt"] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(object["isRead"], serde_json::json!(false));
    }
}
