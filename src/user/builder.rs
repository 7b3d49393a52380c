//! Typed builder for User.

use chrono::{DateTime, Utc};

use crate::user::{Role, User};

/// [`User`] builder. `name`, `email` and `role` must be set before
/// [`UserBuilder::build`] becomes available.
#[derive(Debug, Clone)]
pub struct UserBuilder<Name, Email, R> {
    name: Name,
    email: Email,
    role: R,
    phone: Option<String>,
    national_id: Option<String>,
    age: Option<i32>,
    address: Option<String>,
    client_ids: Vec<String>,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

/// User ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub age: Option<i32>,
    pub address: Option<String>,
    /// Clients to attach when `role` is [`Role::Consultor`].
    pub client_ids: Vec<String>,
}

impl NewUser {
    /// Turn into a stored [`User`].
    pub fn into_user(self, id: String, now: DateTime<Utc>) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            national_id: self.national_id,
            age: self.age,
            address: self.address,
            role: self.role,
            consultor_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl User {
    /// Start a [`UserBuilder`].
    pub fn builder() -> UserBuilder<Missing, Missing, Missing> {
        UserBuilder::new()
    }
}

impl UserBuilder<Missing, Missing, Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            name: Missing,
            email: Missing,
            role: Missing,
            phone: None,
            national_id: None,
            age: None,
            address: None,
            client_ids: Vec::new(),
        }
    }
}

impl Default for UserBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Email, R> UserBuilder<Missing, Email, R> {
    /// Update `name` field on [`UserBuilder`].
    pub fn name(
        self,
        name: impl Into<String>,
    ) -> UserBuilder<Present<String>, Email, R> {
        UserBuilder {
            name: Present(name.into()),
            email: self.email,
            role: self.role,
            phone: self.phone,
            national_id: self.national_id,
            age: self.age,
            address: self.address,
            client_ids: self.client_ids,
        }
    }
}

impl<Name, R> UserBuilder<Name, Missing, R> {
    /// Update `email` field on [`UserBuilder`].
    pub fn email(
        self,
        email: impl Into<String>,
    ) -> UserBuilder<Name, Present<String>, R> {
        UserBuilder {
            name: self.name,
            email: Present(email.into()),
            role: self.role,
            phone: self.phone,
            national_id: self.national_id,
            age: self.age,
            address: self.address,
            client_ids: self.client_ids,
        }
    }
}

impl<Name, Email> UserBuilder<Name, Email, Missing> {
    /// Update `role` field on [`UserBuilder`].
    pub fn role(self, role: Role) -> UserBuilder<Name, Email, Present<Role>> {
        UserBuilder {
            name: self.name,
            email: self.email,
            role: Present(role),
            phone: self.phone,
            national_id: self.national_id,
            age: self.age,
            address: self.address,
            client_ids: self.client_ids,
        }
    }
}

impl<Name, Email, R> UserBuilder<Name, Email, R> {
    /// Update `phone` field on [`UserBuilder`].
    pub fn phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone;
        self
    }

    /// Update `national_id` field on [`UserBuilder`].
    pub fn national_id(mut self, national_id: Option<String>) -> Self {
        self.national_id = national_id;
        self
    }

    /// Update `age` field on [`UserBuilder`].
    pub fn age(mut self, age: Option<i32>) -> Self {
        self.age = age;
        self
    }

    /// Update `address` field on [`UserBuilder`].
    pub fn address(mut self, address: Option<String>) -> Self {
        self.address = address;
        self
    }

    /// Clients to attach once the consultor is created.
    pub fn client_ids(mut self, client_ids: Vec<String>) -> Self {
        self.client_ids = client_ids;
        self
    }
}

impl UserBuilder<Present<String>, Present<String>, Present<Role>> {
    /// Build a [`NewUser`].
    pub fn build(self) -> NewUser {
        NewUser {
            name: self.name.0,
            email: self.email.0,
            role: self.role.0,
            phone: self.phone,
            national_id: self.national_id,
            age: self.age,
            address: self.address,
            client_ids: self.client_ids,
        }
    }
}
