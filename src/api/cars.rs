//! Car Service
//!
//! Cars stored on every node behind the router. Reads go to replicas, writes
//! are broadcast.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::driver::{Row, Value};
use crate::error::{Error, Result};
use crate::router::Router;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS cars (
    id BIGINT NOT NULL PRIMARY KEY,
    number VARCHAR(32) NOT NULL,
    model VARCHAR(32) NOT NULL,
    year VARCHAR(32) NOT NULL,
    mileage VARCHAR(32) NOT NULL,
    inspection_date VARCHAR(32) NOT NULL,
    color VARCHAR(32) NOT NULL
)";

const SELECT_ALL: &str =
    "SELECT id, number, model, year, mileage, inspection_date, color FROM cars ORDER BY id";

const SELECT_ONE: &str =
    "SELECT id, number, model, year, mileage, inspection_date, color FROM cars WHERE id = ?";

const INSERT: &str = "INSERT INTO cars (id, number, model, year, mileage, inspection_date, color) \
    VALUES (?, ?, ?, ?, ?, ?, ?)";

const UPDATE: &str = "UPDATE cars SET number = ?, model = ?, year = ?, mileage = ?, \
    inspection_date = ?, color = ? WHERE id = ?";

const DELETE: &str = "DELETE FROM cars WHERE id = ?";

/// A car record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Car {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub mileage: String,
    #[serde(default)]
    pub inspection_date: String,
    #[serde(default)]
    pub color: String,
}

impl Car {
    /// Decode a row selected with the service's column list
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.try_i64("id")?,
            number: row.try_string("number")?,
            model: row.try_string("model")?,
            year: row.try_string("year")?,
            mileage: row.try_string("mileage")?,
            inspection_date: row.try_string("inspection_date")?,
            color: row.try_string("color")?,
        })
    }

    fn insert_args(&self) -> Vec<Value> {
        vec![
            Value::Int(self.id),
            self.number.clone().into(),
            self.model.clone().into(),
            self.year.clone().into(),
            self.mileage.clone().into(),
            self.inspection_date.clone().into(),
            self.color.clone().into(),
        ]
    }

    fn update_args(&self) -> Vec<Value> {
        vec![
            self.number.clone().into(),
            self.model.clone().into(),
            self.year.clone().into(),
            self.mileage.clone().into(),
            self.inspection_date.clone().into(),
            self.color.clone().into(),
            Value::Int(self.id),
        ]
    }
}

/// CRUD operations on cars through the broadcast router
#[derive(Clone)]
pub struct CarService {
    router: Arc<Router>,
}

impl CarService {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Create the cars table on every node
    pub async fn ensure_schema(&self) -> Result<()> {
        self.router.exec(CREATE_TABLE, &[]).await
    }

    pub async fn list(&self) -> Result<Vec<Car>> {
        let rows = self.router.query(SELECT_ALL, &[]).await?;
        rows.iter().map(Car::from_row).collect()
    }

    /// Fetch one car; `Error::NoRows` if it does not exist
    pub async fn get(&self, id: i64) -> Result<Car> {
        let row = self.router.query_row(SELECT_ONE, &[Value::Int(id)]).await?;
        Car::from_row(&row)
    }

    /// Insert on the primary through a prepared statement, then catch the
    /// replicas up with the same insert.
    pub async fn create(&self, car: &Car) -> Result<()> {
        if car.id <= 0 {
            return Err(Error::InvalidRequest("car id must be positive".into()));
        }

        let args = car.insert_args();
        let stmt = self.router.prepare(INSERT).await?;
        let written = stmt.exec_primary(&args).await;
        if let Err(e) = stmt.close().await {
            tracing::warn!("Failed to close insert statement: {}", e);
        }
        written?;

        self.router.sync(INSERT, &args).await?;
        tracing::info!("Created car {}", car.id);
        Ok(())
    }

    pub async fn update(&self, car: &Car) -> Result<()> {
        self.router.exec(UPDATE, &car.update_args()).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.router.exec(DELETE, &[Value::Int(id)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, Rows};

    fn car_rows() -> Rows {
        Rows::from_values(
            vec![
                "id".into(),
                "number".into(),
                "model".into(),
                "year".into(),
                "mileage".into(),
                "inspection_date".into(),
                "color".into(),
            ],
            vec![vec![
                Value::Int(7),
                "AB-123".into(),
                "Corolla".into(),
                "2019".into(),
                Value::Null,
                "2024-05-01".into(),
                "red".into(),
            ]],
        )
    }

    #[test]
    fn test_from_row_null_is_empty() {
        let rows = car_rows();
        let car = Car::from_row(rows.iter().next().unwrap()).unwrap();
        assert_eq!(car.id, 7);
        assert_eq!(car.model, "Corolla");
        assert_eq!(car.mileage, "");
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_id() {
        let mock = MockDriver::new();
        let router = Router::open_with(Arc::new(mock.clone()), "p;r1")
            .await
            .unwrap();
        let service = CarService::new(Arc::new(router));

        let err = service.create(&Car::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(mock.journal().count("p", |c| matches!(c, crate::driver::Call::Prepare(_))).await, 0);
    }
}
