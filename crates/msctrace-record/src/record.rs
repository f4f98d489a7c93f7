use crate::header::{Header, HEADER_SIZE};
use crate::object::ObjectId;
use crate::opcode::Opcode;
use crate::priority::Priority;

/// One traced action. The variant is always recoverable from its opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Record {
    /// A message sent from one object to another.
    Message {
        source: ObjectId,
        destination: ObjectId,
        message_id: u16,
    },
    /// An asynchronous event delivered to an object.
    Event { subject: ObjectId, event_id: u16 },
    /// An object entered a new state.
    State { subject: ObjectId, state_id: u16 },
    /// A raw 32-bit sample taken at a test point.
    TestPoint { subject: ObjectId, data: u32 },
    /// The object's lifeline ends.
    Destroy { subject: ObjectId },
    /// The object acknowledged a message.
    Acknowledge { subject: ObjectId, message_id: u16 },
}

impl Record {
    pub fn message(
        source: impl Into<ObjectId>,
        destination: impl Into<ObjectId>,
        message_id: u16,
    ) -> Self {
        Record::Message {
            source: source.into(),
            destination: destination.into(),
            message_id,
        }
    }

    pub fn event(subject: impl Into<ObjectId>, event_id: u16) -> Self {
        Record::Event {
            subject: subject.into(),
            event_id,
        }
    }

    pub fn state(subject: impl Into<ObjectId>, state_id: u16) -> Self {
        Record::State {
            subject: subject.into(),
            state_id,
        }
    }

    pub fn test_point(subject: impl Into<ObjectId>, data: u32) -> Self {
        Record::TestPoint {
            subject: subject.into(),
            data,
        }
    }

    pub fn destroy(subject: impl Into<ObjectId>) -> Self {
        Record::Destroy {
            subject: subject.into(),
        }
    }

    pub fn acknowledge(subject: impl Into<ObjectId>, message_id: u16) -> Self {
        Record::Acknowledge {
            subject: subject.into(),
            message_id,
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Record::Message { .. } => Opcode::Msg,
            Record::Event { .. } => Opcode::Evt,
            Record::State { .. } => Opcode::Sta,
            Record::TestPoint { .. } => Opcode::Tp,
            Record::Destroy { .. } => Opcode::Des,
            Record::Acknowledge { .. } => Opcode::Ack,
        }
    }

    /// The object whose lifeline the record is drawn on (the source for messages).
    pub fn subject(&self) -> ObjectId {
        match *self {
            Record::Message { source, .. } => source,
            Record::Event { subject, .. }
            | Record::State { subject, .. }
            | Record::TestPoint { subject, .. }
            | Record::Destroy { subject }
            | Record::Acknowledge { subject, .. } => subject,
        }
    }

    /// Destination object, for messages only.
    pub fn destination(&self) -> Option<ObjectId> {
        match *self {
            Record::Message { destination, .. } => Some(destination),
            _ => None,
        }
    }

    /// The 16-bit identifier carried by the record, if any
    /// (message, event, state or acknowledged message id).
    pub fn id(&self) -> Option<u16> {
        match *self {
            Record::Message { message_id, .. } | Record::Acknowledge { message_id, .. } => {
                Some(message_id)
            }
            Record::Event { event_id, .. } => Some(event_id),
            Record::State { state_id, .. } => Some(state_id),
            Record::TestPoint { .. } | Record::Destroy { .. } => None,
        }
    }

    pub fn payload_len(&self) -> usize {
        self.opcode().payload_len()
    }

    /// Attach a priority, producing the unit that goes on the wire.
    pub fn with_priority(self, priority: Priority) -> Packet {
        Packet::new(self, priority)
    }
}

/// A record together with the priority flags it travels with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Packet {
    pub priority: Priority,
    pub record: Record,
}

impl Packet {
    pub fn new(record: Record, priority: Priority) -> Self {
        Self { priority, record }
    }

    pub fn header(&self) -> Header {
        Header::new(self.record.opcode(), self.priority)
    }

    /// Total wire size (header + payload).
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.record.payload_len()
    }
}

impl From<Record> for Packet {
    fn from(record: Record) -> Self {
        Packet::new(record, Priority::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_pick_matching_opcode() {
        let a = ObjectId::new(1, 10);
        let b = ObjectId::new(2, 8);
        let cases = [
            (Record::message(a, b, 0), Opcode::Msg),
            (Record::event(a, 1), Opcode::Evt),
            (Record::state(a, 2), Opcode::Sta),
            (Record::test_point(a, 0x1234_5678), Opcode::Tp),
            (Record::destroy(a), Opcode::Des),
            (Record::acknowledge(a, 3), Opcode::Ack),
        ];
        for (record, opcode) in cases {
            assert_eq!(record.opcode(), opcode);
            assert_eq!(record.subject(), a);
            assert_eq!(record.payload_len(), opcode.payload_len());
        }
    }

    #[test]
    fn accessors() {
        let msg = Record::message((2, 8), (1, 10), 7);
        assert_eq!(msg.destination(), Some(ObjectId::new(1, 10)));
        assert_eq!(msg.id(), Some(7));
        assert_eq!(Record::test_point((1, 1), 9).id(), None);
        assert_eq!(Record::destroy((1, 1)).destination(), None);
    }

    #[test]
    fn packet_header_and_size() {
        let packet = Record::event((3, 1), 42).with_priority(Priority::SEQUENTIAL);
        let header = packet.header();
        assert_eq!(header.opcode, Opcode::Evt);
        assert_eq!(header.length, 4);
        assert_eq!(packet.wire_len(), 6);
        assert_eq!(Packet::from(Record::destroy((0, 0))).priority, Priority::empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_with_kind_tag() {
        let value = serde_json::to_value(Record::event((3, 1), 42)).unwrap();
        assert_eq!(value["kind"], "event");
        assert_eq!(value["subject"], 0x0301);
        assert_eq!(value["event_id"], 42);
    }
}
