mod dashboard_test;
mod query_test;
mod registry_test;
