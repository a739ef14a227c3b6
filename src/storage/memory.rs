use std::sync::atomic::{AtomicI64, Ordering};

use chrono::NaiveDateTime;
use dashmap::DashMap;
use parking_lot::RwLock;

use super::snapshot::StoreSnapshot;
use super::{AlertStore, StorageError};
use crate::alerts::DefinitionConfig;
use crate::data::{AlertRecord, Goal, Meter, NotificationRecord, Reading, RunMarker};

/// Status written on freshly created alerts
pub const ALERT_STATUS_OPEN: u8 = 0;

/// In-memory store
///
/// Readings are kept per meter in timestamp order; appended tables are
/// guarded by `RwLock`s. Alert rows are unique per
/// (definition, meter, timestamp).
pub struct MemoryStore {
    meters: DashMap<i64, Meter>,
    readings: DashMap<i64, Vec<Reading>>,
    goals: DashMap<i64, Goal>,
    definitions: RwLock<Vec<DefinitionConfig>>,
    alerts: RwLock<Vec<AlertRecord>>,
    notifications: RwLock<Vec<NotificationRecord>>,
    run_markers: RwLock<Vec<RunMarker>>,
    next_alert_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            meters: DashMap::new(),
            readings: DashMap::new(),
            goals: DashMap::new(),
            definitions: RwLock::new(Vec::new()),
            alerts: RwLock::new(Vec::new()),
            notifications: RwLock::new(Vec::new()),
            run_markers: RwLock::new(Vec::new()),
            next_alert_id: AtomicI64::new(1),
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        for meter in snapshot.meters {
            store.insert_meter(meter);
        }
        store.insert_readings(snapshot.readings);
        for goal in snapshot.goals {
            store.insert_goal(goal);
        }
        for definition in snapshot.definitions {
            store.insert_definition(definition);
        }

        let next_id = snapshot.alerts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        store.next_alert_id.store(next_id, Ordering::SeqCst);
        *store.alerts.write() = snapshot.alerts;
        *store.notifications.write() = snapshot.notifications;
        *store.run_markers.write() = snapshot.run_markers;
        store
    }

    pub fn to_snapshot(&self) -> StoreSnapshot {
        let mut meters: Vec<Meter> = self.meters.iter().map(|e| e.value().clone()).collect();
        meters.sort_by_key(|m| m.id);

        let mut readings: Vec<Reading> = self
            .readings
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        readings.sort_by(|a, b| a.meter_id.cmp(&b.meter_id).then(a.timestamp.cmp(&b.timestamp)));

        let mut goals: Vec<Goal> = self.goals.iter().map(|e| e.value().clone()).collect();
        goals.sort_by_key(|g| g.meter_id);

        StoreSnapshot {
            schema_version: StoreSnapshot::SCHEMA_VERSION,
            meters,
            readings,
            goals,
            definitions: self.definitions.read().clone(),
            alerts: self.alerts(),
            notifications: self.notification_records(),
            run_markers: self.run_markers.read().clone(),
        }
    }

    pub fn insert_meter(&self, meter: Meter) {
        self.meters.insert(meter.id, meter);
    }

    /// Insert readings, keeping each meter's series sorted by timestamp
    pub fn insert_readings(&self, readings: Vec<Reading>) {
        for reading in readings {
            let mut series = self.readings.entry(reading.meter_id).or_default();
            let pos = series.partition_point(|r| r.timestamp <= reading.timestamp);
            series.insert(pos, reading);
        }
    }

    pub fn insert_goal(&self, goal: Goal) {
        self.goals.insert(goal.meter_id, goal);
    }

    /// Insert or replace a definition by id
    pub fn insert_definition(&self, definition: DefinitionConfig) {
        let mut definitions = self.definitions.write();
        match definitions.iter_mut().find(|d| d.id == definition.id) {
            Some(existing) => *existing = definition,
            None => definitions.push(definition),
        }
    }

    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.read().clone()
    }

    pub fn notification_records(&self) -> Vec<NotificationRecord> {
        self.notifications.read().clone()
    }

    pub fn run_markers(&self) -> Vec<RunMarker> {
        self.run_markers.read().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore for MemoryStore {
    fn fetch_readings(
        &self,
        meter_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Reading>, StorageError> {
        Ok(self
            .readings
            .get(&meter_id)
            .map(|series| {
                series
                    .iter()
                    .filter(|r| start <= r.timestamp && r.timestamp < end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_meter(&self, meter_id: i64) -> Result<Option<Meter>, StorageError> {
        Ok(self.meters.get(&meter_id).map(|m| m.value().clone()))
    }

    fn fetch_goal(&self, meter_id: i64) -> Result<Option<Goal>, StorageError> {
        Ok(self.goals.get(&meter_id).map(|g| g.value().clone()))
    }

    fn fetch_active_definitions(&self) -> Result<Vec<DefinitionConfig>, StorageError> {
        Ok(self
            .definitions
            .read()
            .iter()
            .filter(|d| d.is_active())
            .cloned()
            .collect())
    }

    fn fetch_definition(&self, definition_id: i64) -> Result<Option<DefinitionConfig>, StorageError> {
        Ok(self
            .definitions
            .read()
            .iter()
            .find(|d| d.id == definition_id)
            .cloned())
    }

    fn fetch_last_run_marker(&self) -> Result<Option<NaiveDateTime>, StorageError> {
        Ok(self.run_markers.read().iter().map(|m| m.launched_at).max())
    }

    fn fetch_last_notification(
        &self,
        definition_id: i64,
        policy_id: i64,
    ) -> Result<Option<NaiveDateTime>, StorageError> {
        Ok(self
            .notifications
            .read()
            .iter()
            .filter(|n| n.definition_id == definition_id && n.policy_id == policy_id)
            .map(|n| n.sent_at)
            .max())
    }

    fn append_alert(
        &self,
        definition_id: i64,
        meter_id: i64,
        data: f64,
        value: f64,
        timestamp: NaiveDateTime,
    ) -> Result<i64, StorageError> {
        let mut alerts = self.alerts.write();
        let exists = alerts.iter().any(|a| {
            a.definition_id == definition_id && a.meter_id == meter_id && a.created_at == timestamp
        });
        if exists {
            return Err(StorageError::Duplicate {
                definition_id,
                meter_id,
                timestamp,
            });
        }

        let id = self.next_alert_id.fetch_add(1, Ordering::SeqCst);
        alerts.push(AlertRecord {
            id,
            definition_id,
            meter_id,
            data,
            value,
            status: ALERT_STATUS_OPEN,
            created_at: timestamp,
        });
        Ok(id)
    }

    fn append_notification_record(
        &self,
        definition_id: i64,
        policy_id: i64,
        timestamp: NaiveDateTime,
    ) -> Result<(), StorageError> {
        self.notifications.write().push(NotificationRecord {
            definition_id,
            policy_id,
            sent_at: timestamp,
        });
        Ok(())
    }

    fn append_run_marker(&self, timestamp: NaiveDateTime) -> Result<(), StorageError> {
        self.run_markers.write().push(RunMarker {
            launched_at: timestamp,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 7, 29)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_readings_are_ordered_and_half_open() {
        let store = MemoryStore::new();
        store.insert_readings(vec![
            Reading::new(1, 3.0, at(3)),
            Reading::new(1, 1.0, at(1)),
            Reading::new(2, 9.0, at(2)),
            Reading::new(1, 2.0, at(2)),
        ]);

        let readings = store.fetch_readings(1, at(1), at(3)).unwrap();
        let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0]);

        assert!(store.fetch_readings(3, at(0), at(23)).unwrap().is_empty());
    }

    #[test]
    fn test_alert_unique_per_run() {
        let store = MemoryStore::new();
        let first = store.append_alert(1, 10, 5.0, 5.0, at(12)).unwrap();
        let second = store.append_alert(1, 11, 5.0, 5.0, at(12)).unwrap();
        assert_eq!(second, first + 1);

        let err = store.append_alert(1, 10, 6.0, 5.0, at(12)).unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { meter_id: 10, .. }));

        // next run is a new timestamp
        assert!(store.append_alert(1, 10, 6.0, 5.0, at(13)).is_ok());
        assert_eq!(store.alerts().len(), 3);
    }

    #[test]
    fn test_last_notification_and_marker() {
        let store = MemoryStore::new();
        assert_eq!(store.fetch_last_notification(1, 1).unwrap(), None);
        assert_eq!(store.fetch_last_run_marker().unwrap(), None);

        store.append_notification_record(1, 1, at(5)).unwrap();
        store.append_notification_record(1, 1, at(9)).unwrap();
        store.append_notification_record(1, 2, at(11)).unwrap();
        store.append_run_marker(at(9)).unwrap();
        store.append_run_marker(at(10)).unwrap();

        assert_eq!(store.fetch_last_notification(1, 1).unwrap(), Some(at(9)));
        assert_eq!(store.fetch_last_notification(1, 2).unwrap(), Some(at(11)));
        assert_eq!(store.fetch_last_notification(2, 1).unwrap(), None);
        assert_eq!(store.fetch_last_run_marker().unwrap(), Some(at(10)));
    }

    #[test]
    fn test_snapshot_round_trip_keeps_alert_ids() {
        let store = MemoryStore::new();
        store.insert_meter(Meter::new(1, "meter_1").with_counter(true));
        store.insert_readings(vec![Reading::new(1, 1.0, at(1))]);
        store.append_alert(1, 1, 2.0, 1.0, at(2)).unwrap();
        store.append_run_marker(at(2)).unwrap();

        let restored = MemoryStore::from_snapshot(store.to_snapshot());
        assert_eq!(restored.fetch_meter(1).unwrap(), store.fetch_meter(1).unwrap());
        assert_eq!(restored.fetch_last_run_marker().unwrap(), Some(at(2)));

        let id = restored
            .append_alert(1, 1, 2.0, 1.0, at(2) + Duration::hours(1))
            .unwrap();
        assert_eq!(id, 2);
    }
}
