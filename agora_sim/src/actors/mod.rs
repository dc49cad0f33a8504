//! Bookstore actors and store population.

mod customer;
mod employee;
mod product;

pub use customer::Customer;
pub use employee::{Employee, Role};
pub use product::{DemandTrend, Product};

use crate::error::SimError;
use crate::world::SimWorld;

use agora_bus::ActorId;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Display name suffix: A..Z, then the index.
fn letter(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => index.to_string(),
    }
}

/// Populates a world with customers, employees and one product actor per
/// catalog title. Initial budgets, efficiencies and popularity come from
/// `rng`.
pub fn populate(
    world: &mut SimWorld,
    num_customers: usize,
    num_employees: usize,
    rng: &mut ChaCha8Rng,
) -> Result<(), SimError> {
    for i in 0..num_customers {
        let id = ActorId::new(format!("customer_{}", i))?;
        let name = format!("Customer_{}", letter(i));
        let budget = rng.gen_range(30.0..150.0);

        world.catalog.create_customer(id.as_str(), name.as_str(), budget);
        info!("Customer {} created with budget ${:.2}", name, budget);
        world.add_actor(id.clone(), Box::new(Customer::new(name, id.as_str(), budget)))?;
    }

    let roles = Role::all();
    for i in 0..num_employees {
        let id = ActorId::new(format!("employee_{}", i))?;
        let name = format!("Employee_{}", letter(i));
        let role = roles[i % roles.len()];
        let efficiency = rng.gen_range(0.7..1.0);

        info!("Employee {} ({}) hired", name, role);
        world.add_actor(id, Box::new(Employee::new(name, role, efficiency)))?;
    }

    let books: Vec<_> = world.catalog.books().cloned().collect();
    for (i, book) in books.iter().enumerate() {
        let id = ActorId::new(format!("book_{}", i))?;
        let popularity = rng.gen_range(0.1..1.0);
        let trend = DemandTrend::all()
            .choose(rng)
            .copied()
            .unwrap_or(DemandTrend::Stable);

        world.add_actor(id, Box::new(Product::new(book, popularity, trend)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter() {
        assert_eq!(letter(0), "A");
        assert_eq!(letter(25), "Z");
        assert_eq!(letter(26), "26");
    }
}
