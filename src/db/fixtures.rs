//! In-memory fixture datasets
//!
//! Two small datasets are attached to every fixture connection:
//! `hr` (employees and departments) and `foodmart` (a slice of the
//! FoodMart sales star).

/// Schema and rows of the `hr` dataset
pub const HR: &str = "
ATTACH DATABASE ':memory:' AS hr;
CREATE TABLE hr.depts (
    deptno INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE hr.emps (
    empid INTEGER PRIMARY KEY,
    deptno INTEGER NOT NULL,
    name TEXT NOT NULL,
    salary REAL NOT NULL,
    commission INTEGER
);
INSERT INTO hr.depts (deptno, name) VALUES
    (10, 'Sales'),
    (30, 'Marketing'),
    (40, 'HR');
INSERT INTO hr.emps (empid, deptno, name, salary, commission) VALUES
    (100, 10, 'Bill', 10000.0, 1000),
    (200, 20, 'Eric', 8000.0, 500),
    (150, 10, 'Sebastian', 7000.0, NULL),
    (110, 10, 'Theodore', 11500.0, 250);
";

/// Schema and rows of the `foodmart` dataset
pub const FOODMART: &str = "
ATTACH DATABASE ':memory:' AS foodmart;
CREATE TABLE foodmart.product (
    product_id INTEGER PRIMARY KEY,
    product_name TEXT NOT NULL
);
CREATE TABLE foodmart.sales_fact_1997 (
    cust_id INTEGER NOT NULL,
    prod_id INTEGER NOT NULL
);
INSERT INTO foodmart.product (product_id, product_name) VALUES
    (10, 'Washington Berry Juice'),
    (20, 'Washington Mango Drink');
INSERT INTO foodmart.sales_fact_1997 (cust_id, prod_id) VALUES
    (100, 10),
    (150, 20);
";

/// Names of the attached fixture datasets, in load order
pub const DATASETS: [(&str, &str); 2] = [("hr", HR), ("foodmart", FOODMART)];
