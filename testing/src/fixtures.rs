use pgpal_core::{
    Bed, BedId, BedStatus, Money, OwnerId, Property, PropertyId, Room, RoomId,
};

use crate::store::InMemoryStore;

/// An owner with one property and one room, seeded into a store.
#[derive(Clone, Debug)]
pub struct PropertyFixture {
    /// The owner
    pub owner_id: OwnerId,
    /// The owner's property
    pub property: Property,
    /// A room in the property
    pub room: Room,
}

impl PropertyFixture {
    /// Seed a fresh owner, property and room.
    pub async fn create(store: &InMemoryStore) -> Self {
        Self::create_for(store, OwnerId::new()).await
    }

    /// Seed a property and room for an existing owner.
    pub async fn create_for(store: &InMemoryStore, owner_id: OwnerId) -> Self {
        let property = Property {
            id: PropertyId::new(),
            owner_id,
            name: "Sunrise PG".to_string(),
            address: "12 MG Road".to_string(),
        };
        let room = Room {
            id: RoomId::new(),
            property_id: property.id,
            room_number: "101".to_string(),
            floor: 1,
        };
        store.put_property(property.clone()).await;
        store.put_room(room.clone()).await;

        Self {
            owner_id,
            property,
            room,
        }
    }

    /// Seed an available bed in the room.
    pub async fn add_bed(&self, store: &InMemoryStore, label: &str, rent: Money) -> BedId {
        self.add_bed_with_status(store, label, rent, BedStatus::Available)
            .await
    }

    /// Seed a bed with an explicit status.
    pub async fn add_bed_with_status(
        &self,
        store: &InMemoryStore,
        label: &str,
        rent: Money,
        status: BedStatus,
    ) -> BedId {
        let bed = Bed {
            id: BedId::new(),
            room_id: self.room.id,
            bed_number: label.to_string(),
            rent_amount: rent,
            status,
        };
        let id = bed.id;
        store.put_bed(bed).await;
        id
    }
}
