//! Shared test harness utilities for dogma crates.

use dogma_config::{Config, DuplicatePolicy, ExtractSettings};

/// Returns a baseline configuration for tests.
pub fn test_config() -> Config {
    Config::default()
}

/// Default extraction settings with a different duplicate policy.
pub fn settings_with_duplicates(duplicates: DuplicatePolicy) -> ExtractSettings {
    ExtractSettings {
        duplicates,
        ..ExtractSettings::default()
    }
}

/// A complete contract document exercising endpoints, types and front matter.
pub const USERS_CONTRACT: &str = r#"---
title: Users service
version: 2
---

# Users service

Prose that is not part of the contract.

# API

## users/{id}

Fetch a single user.

Method: GET

### Params

| Name | Type   | Description      |
| ---- | ------ | ---------------- |
| id   | string | user identifier  |

### Result

| Name | Type | Description |
| ---- | ---- | ----------- |
| user | User | the user    |

## users

- method: `POST`

### Body

| Name  | Type   | Required |
| ----- | ------ | -------- |
| name  | string | yes      |
| email | string | no       |

### Result

```json
{ "id": "string" }
```

### Notes

Free-form notes are skipped.

# Types

## User

| Name  | Type   | Description   |
| ----- | ------ | ------------- |
| id    | string | identifier    |
| name  | string | display name  |

## Role

```ts
type Role = "admin" | "member";
```

## Token

An opaque bearer token string.
"#;
