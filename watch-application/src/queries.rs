pub mod mob_queries;
