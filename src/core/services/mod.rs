pub mod accounts;
pub mod billing_projects;
pub mod managed_groups;
pub mod workspaces;

#[cfg(test)]
pub(crate) mod testing;
