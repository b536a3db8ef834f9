mod ddl;
